//! Fire-and-poll bridge onto the application's async command surface
//!
//! The dispatch layer acknowledges an evaluate synchronously and never
//! relays a promise's eventual value, so awaiting in-band is not
//! possible. Instead a wrapper expression fires the real call and parks
//! its outcome in a window global, and the bridge reads that slot with
//! tiny evaluates until it fills or the deadline passes. Each call
//! stamps the slot with a fresh token; a late write from an abandoned
//! call carries the wrong token and is ignored.

use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{InspectorError, Result};
use crate::session::InspectorSession;

/// Window global holding {token, success, value|error} once the call lands.
const RESULT_SLOT: &str = "__e2e_result";
/// Window global flagging a call still in flight.
const PENDING_FLAG: &str = "__e2e_pending";

/// Progress of one bridged call. One transition per poll read.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState {
    /// Wrapper evaluated, remote call fired.
    Issued,
    /// Slot still empty, or holding a stale write.
    Pending,
    /// Slot filled with a success value.
    Resolved(Value),
    /// Slot filled with a remote error string.
    Failed(String),
}

impl CallState {
    fn label(&self) -> &'static str {
        match self {
            CallState::Issued => "issued",
            CallState::Pending => "pending",
            CallState::Resolved(_) => "resolved",
            CallState::Failed(_) => "failed",
        }
    }
}

/// Wrapper fired once per call. Sets the pending flag, invokes the
/// command without awaiting it in this exchange, and writes the tagged
/// outcome into the slot on completion.
fn fire_expression(command: &str, args: &Value, token: u64) -> String {
    format!(
        r#"(() => {{
    window.{pending} = true;
    window.{slot} = null;
    (async () => {{
        try {{
            const value = await window.__TAURI_INTERNALS__.invoke('{command}', {args});
            window.{slot} = {{ token: {token}, success: true, value: value === undefined ? null : value }};
        }} catch (error) {{
            window.{slot} = {{ token: {token}, success: false, error: String(error) }};
        }} finally {{
            window.{pending} = false;
        }}
    }})();
    return 'issued';
}})()"#,
        pending = PENDING_FLAG,
        slot = RESULT_SLOT,
        command = command,
        args = args,
        token = token,
    )
}

/// Tiny read evaluated every poll: null while pending, the slot after.
fn poll_expression() -> String {
    format!("window.{PENDING_FLAG} ? null : window.{RESULT_SLOT}")
}

/// Interpret one poll read against this call's token.
fn step(read: &Value, token: u64) -> CallState {
    if read.is_null() {
        return CallState::Pending;
    }
    match read.get("token").and_then(Value::as_u64) {
        Some(seen) if seen == token => {}
        seen => {
            tracing::debug!(?seen, expected = token, "stale result slot ignored");
            return CallState::Pending;
        }
    }
    if read.get("success").and_then(Value::as_bool).unwrap_or(false) {
        CallState::Resolved(read.get("value").cloned().unwrap_or(Value::Null))
    } else {
        let message = read
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown remote error")
            .to_string();
        CallState::Failed(message)
    }
}

impl InspectorSession {
    /// Call a named application command and wait for its eventual
    /// outcome. `timeout` bounds the whole fire-and-poll exchange; the
    /// fire and each individual poll are additionally bounded by the
    /// session's evaluate deadline.
    pub async fn invoke(&mut self, command: &str, args: Value, timeout: Duration) -> Result<Value> {
        let token = self.next_call_token();
        let deadline = Instant::now() + timeout;

        self.evaluate(&fire_expression(command, &args, token)).await?;
        let mut state = CallState::Issued;
        tracing::debug!(command, token, "bridged call issued");

        let poll = poll_expression();
        loop {
            if Instant::now() >= deadline {
                tracing::warn!(command, token, "bridged call timed out; a late write stays ignored");
                return Err(InspectorError::Timeout {
                    waiting_on: format!("bridged call {command}"),
                    timeout,
                });
            }
            let read = self.evaluate(&poll).await?;
            let next = step(&read, token);
            if next != state {
                tracing::trace!(command, state = next.label(), "bridged call advanced");
                state = next;
            }
            match state {
                CallState::Resolved(value) => return Ok(value),
                CallState::Failed(message) => return Err(InspectorError::RemoteCall { message }),
                CallState::Issued | CallState::Pending => {
                    tokio::time::sleep(self.config().poll_interval).await;
                }
            }
        }
    }
}
