//! Wire envelope types for the remote inspector protocol
//!
//! Two envelope levels share one socket: outer frames speak to the
//! connection itself (Target.*) and carry inner frames as JSON-in-a-string
//! payloads. Ids at the two levels come from separate counters and are
//! never comparable.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{InspectorError, Result};

/// Correlation id - monotonically increasing, per nesting level
pub type RequestId = u64;

/// Opaque identifier of the remote debuggable page
pub type TargetId = String;

/// Unsolicited announcement of a debuggable target
pub const TARGET_CREATED: &str = "Target.targetCreated";
/// Explicit target enumeration
pub const GET_TARGETS: &str = "Target.getTargets";
/// Deliver an inner envelope to a target
pub const SEND_TO_TARGET: &str = "Target.sendMessageToTarget";
/// Inner envelope coming back from a target
pub const DISPATCH_FROM_TARGET: &str = "Target.dispatchMessageFromTarget";
/// Inner method: evaluate an expression in the page
pub const EVALUATE: &str = "Runtime.evaluate";

/// Request envelope, either nesting level
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: RequestId, method: &str, params: Option<Value>) -> Self {
        Self {
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Inner evaluate envelope. `awaitPromise` is only serialized when
    /// asked for; the proxy rejects unknown fields on some builds.
    pub fn evaluate(id: RequestId, expression: &str, await_promise: bool) -> Self {
        let mut params = json!({
            "expression": expression,
            "returnByValue": true,
        });
        if await_promise {
            params["awaitPromise"] = json!(true);
        }
        Self::new(id, EVALUATE, Some(params))
    }

    /// Outer envelope carrying `inner` serialized as a string payload,
    /// addressed to one target.
    pub fn send_to_target(id: RequestId, target_id: &str, inner: &Request) -> Result<Self> {
        let message = serde_json::to_string(inner)?;
        Ok(Self::new(
            id,
            SEND_TO_TARGET,
            Some(json!({
                "targetId": target_id,
                "message": message,
            })),
        ))
    }
}

/// Response frame correlating to a request id
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ProtocolError>,
    /// Some proxies report evaluation exceptions here rather than
    /// inside `result`.
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<Value>,
}

/// Remote-reported protocol error
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolError {
    #[serde(default)]
    pub code: i32,
    pub message: String,
}

/// Event frame (no id)
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// One inbound frame, either shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Response(Response),
    Event(Event),
}

/// Entry of a target announcement or enumeration
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    #[serde(rename = "type", default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse one wire frame. None for anything that is not a recognizable
/// envelope; the caller logs and moves on.
pub fn parse_frame(text: &str) -> Option<Frame> {
    match serde_json::from_str(text) {
        Ok(frame) => Some(frame),
        Err(error) => {
            tracing::debug!(%error, "discarding unparseable frame");
            None
        }
    }
}

impl Event {
    /// Target id carried by an announcement event, if this is one.
    pub fn announced_target(&self) -> Option<TargetId> {
        if self.method != TARGET_CREATED {
            return None;
        }
        let info = self.params.get("targetInfo")?.clone();
        serde_json::from_value::<TargetInfo>(info)
            .ok()
            .map(|info| info.target_id)
    }

    /// Inner frame carried by a dispatch event, parsed a second time
    /// out of the string payload.
    pub fn dispatched_frame(&self) -> Option<Frame> {
        if self.method != DISPATCH_FROM_TARGET {
            return None;
        }
        let message = self.params.get("message")?.as_str()?;
        parse_frame(message)
    }
}

impl Response {
    /// First entry of a target enumeration result.
    pub fn first_target(&self) -> Option<TargetId> {
        let list = self.result.as_ref()?.get("targetList")?.as_array()?;
        let info = list.first()?.clone();
        serde_json::from_value::<TargetInfo>(info)
            .ok()
            .map(|info| info.target_id)
    }

    /// Unwrap an inner evaluate response into its plain value. A remote
    /// exception, wherever the proxy put it, becomes `RemoteEvaluation`
    /// with the remote-supplied text.
    pub fn into_evaluation(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(InspectorError::RemoteEvaluation {
                message: error.message,
            });
        }
        let result = self.result.unwrap_or(Value::Null);
        let exception = self
            .exception_details
            .as_ref()
            .or_else(|| result.get("exceptionDetails"));
        if let Some(details) = exception {
            let message = details
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| {
                    details
                        .get("exception")
                        .and_then(|e| e.get("description"))
                        .and_then(Value::as_str)
                })
                .unwrap_or("unknown exception")
                .to_string();
            return Err(InspectorError::RemoteEvaluation { message });
        }
        Ok(result
            .get("result")
            .and_then(|inner| inner.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
