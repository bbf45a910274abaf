//! Target session and correlation engine
//!
//! Design decisions:
//! 1. One session owns one connection and one discovered target id
//! 2. Outer and inner envelopes draw ids from their own monotonic
//!    counters - the two spaces are never compared
//! 3. One call outstanding at a time, enforced by &mut self; inbound
//!    frames match by exact id and everything else is logged and dropped

use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::discovery::{self, DiscoveryConfig};
use crate::error::{InspectorError, Result};
use crate::protocol::{self, Frame, Request, RequestId, TargetId};
use crate::transport::Transport;

/// Session tuning. Defaults fit an interactive desktop app under test;
/// tests shrink the windows to milliseconds.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub discovery: DiscoveryConfig,
    /// Wait for an unsolicited target announcement after connecting.
    pub announce_window: Duration,
    /// Wait on the explicit enumeration fallback.
    pub list_window: Duration,
    /// Default deadline for one outer call.
    pub call_timeout: Duration,
    /// Default deadline for one evaluate round-trip.
    pub eval_timeout: Duration,
    /// Cadence of bridged-call polls.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            announce_window: Duration::from_secs(5),
            list_window: Duration::from_secs(3),
            call_timeout: Duration::from_secs(10),
            eval_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Monotonic id source starting at 1.
#[derive(Debug, Default)]
struct IdCounter(RequestId);

impl IdCounter {
    fn next(&mut self) -> RequestId {
        self.0 += 1;
        self.0
    }
}

/// One debugging session against one remote page.
#[derive(Debug)]
pub struct InspectorSession {
    transport: Transport,
    target_id: TargetId,
    outer_ids: IdCounter,
    inner_ids: IdCounter,
    call_tokens: IdCounter,
    config: SessionConfig,
}

impl InspectorSession {
    /// Discover the endpoint, connect, and resolve the target id.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let endpoint = discovery::discover(&config.discovery).await?;
        let transport = Transport::connect(&endpoint.ws_url()).await?;
        Self::attach(transport, config).await
    }

    /// Run the target handshake on an already-open transport.
    ///
    /// An unsolicited announcement is given the first window to itself;
    /// only when it closes empty is an explicit enumeration sent, and
    /// then either the announcement or the list's first entry wins.
    pub async fn attach(mut transport: Transport, config: SessionConfig) -> Result<Self> {
        let mut outer_ids = IdCounter::default();

        let target_id =
            match Self::await_announcement(&mut transport, config.announce_window).await? {
                Some(target_id) => target_id,
                None => {
                    Self::request_target_list(&mut transport, &mut outer_ids, config.list_window)
                        .await?
                }
            };

        tracing::info!(target = %target_id, "inspector target resolved");
        Ok(Self {
            transport,
            target_id,
            outer_ids,
            inner_ids: IdCounter::default(),
            call_tokens: IdCounter::default(),
            config,
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn next_call_token(&mut self) -> u64 {
        self.call_tokens.next()
    }

    async fn await_announcement(
        transport: &mut Transport,
        window: Duration,
    ) -> Result<Option<TargetId>> {
        let deadline = Instant::now() + window;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let text = match transport.receive(deadline - now).await {
                Ok(text) => text,
                Err(InspectorError::Timeout { .. }) => return Ok(None),
                Err(other) => return Err(other),
            };
            match protocol::parse_frame(&text) {
                Some(Frame::Event(event)) => {
                    if let Some(target_id) = event.announced_target() {
                        return Ok(Some(target_id));
                    }
                    tracing::debug!(method = %event.method, "unrelated event during handshake");
                }
                Some(Frame::Response(response)) => {
                    tracing::debug!(id = response.id, "stray response during handshake");
                }
                None => {}
            }
        }
    }

    async fn request_target_list(
        transport: &mut Transport,
        outer_ids: &mut IdCounter,
        window: Duration,
    ) -> Result<TargetId> {
        let id = outer_ids.next();
        let request = Request::new(id, protocol::GET_TARGETS, None);
        transport.send(serde_json::to_string(&request)?).await?;
        tracing::debug!(id, "no announcement, asking for the target list");

        let deadline = Instant::now() + window;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(InspectorError::NoTargetFound);
            }
            let text = match transport.receive(deadline - now).await {
                Ok(text) => text,
                Err(InspectorError::Timeout { .. }) => return Err(InspectorError::NoTargetFound),
                Err(other) => return Err(other),
            };
            match protocol::parse_frame(&text) {
                Some(Frame::Event(event)) => {
                    if let Some(target_id) = event.announced_target() {
                        return Ok(target_id);
                    }
                    tracing::debug!(method = %event.method, "unrelated event during handshake");
                }
                Some(Frame::Response(response)) if response.id == id => {
                    if let Some(target_id) = response.first_target() {
                        return Ok(target_id);
                    }
                    tracing::debug!("target list came back empty");
                }
                Some(Frame::Response(response)) => {
                    tracing::debug!(id = response.id, "stray response during handshake");
                }
                None => {}
            }
        }
    }

    /// Send one outer command and wait for the response bearing its id.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        self.call_with_timeout(method, params, self.config.call_timeout)
            .await
    }

    pub async fn call_with_timeout(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let id = self.outer_ids.next();
        let request = Request::new(id, method, params);
        self.transport.send(serde_json::to_string(&request)?).await?;
        tracing::debug!(id, method, "outer command sent");

        let deadline = Instant::now() + timeout;
        loop {
            let frame = match self.next_frame(deadline).await? {
                Some(frame) => frame,
                None => {
                    return Err(InspectorError::Timeout {
                        waiting_on: format!("response to {method}"),
                        timeout,
                    })
                }
            };
            match frame {
                Frame::Response(response) if response.id == id => {
                    if let Some(error) = response.error {
                        return Err(InspectorError::Protocol {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(response.result.unwrap_or(Value::Null));
                }
                other => self.note_unmatched(&other),
            }
        }
    }

    /// Evaluate an expression in the target page and return its value.
    pub async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        self.evaluate_with(expression, false, self.config.eval_timeout)
            .await
    }

    /// Evaluate with explicit promise-await and deadline control.
    ///
    /// The inner envelope rides inside an outer dispatch. The outer
    /// acknowledgment is observed but only the inner response carrying
    /// the matching inner id resolves the call; every other frame on
    /// the wire is noise here.
    pub async fn evaluate_with(
        &mut self,
        expression: &str,
        await_promise: bool,
        timeout: Duration,
    ) -> Result<Value> {
        let inner_id = self.inner_ids.next();
        let inner = Request::evaluate(inner_id, expression, await_promise);
        let outer_id = self.outer_ids.next();
        let outer = Request::send_to_target(outer_id, &self.target_id, &inner)?;
        self.transport.send(serde_json::to_string(&outer)?).await?;
        tracing::trace!(outer_id, inner_id, "evaluate dispatched");

        let deadline = Instant::now() + timeout;
        loop {
            let frame = match self.next_frame(deadline).await? {
                Some(frame) => frame,
                None => {
                    return Err(InspectorError::Timeout {
                        waiting_on: "evaluation result".to_string(),
                        timeout,
                    })
                }
            };
            match frame {
                Frame::Event(event) if event.method == protocol::DISPATCH_FROM_TARGET => {
                    match event.dispatched_frame() {
                        Some(Frame::Response(inner_response)) if inner_response.id == inner_id => {
                            return inner_response.into_evaluation();
                        }
                        Some(Frame::Response(other)) => {
                            tracing::debug!(
                                inner_id = other.id,
                                "dispatched response for another call discarded"
                            );
                        }
                        Some(Frame::Event(page_event)) => {
                            tracing::trace!(method = %page_event.method, "dispatched page event discarded");
                        }
                        None => {
                            tracing::debug!("dispatch payload was not a frame");
                        }
                    }
                }
                Frame::Response(response) if response.id == outer_id => {
                    // The answer still arrives as a dispatch event; a
                    // rejected dispatch means it never will.
                    if let Some(error) = response.error {
                        return Err(InspectorError::Protocol {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    tracing::trace!(outer_id, "dispatch acknowledged");
                }
                other => self.note_unmatched(&other),
            }
        }
    }

    /// One bounded read. Ok(None) once the deadline has passed;
    /// unparseable text is logged inside the parser and skipped.
    async fn next_frame(&mut self, deadline: Instant) -> Result<Option<Frame>> {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            match self.transport.receive(deadline - now).await {
                Ok(text) => {
                    if let Some(frame) = protocol::parse_frame(&text) {
                        return Ok(Some(frame));
                    }
                }
                Err(InspectorError::Timeout { .. }) => return Ok(None),
                Err(other) => return Err(other),
            }
        }
    }

    fn note_unmatched(&self, frame: &Frame) {
        match frame {
            Frame::Response(response) => {
                tracing::debug!(id = response.id, "unmatched response discarded");
            }
            Frame::Event(event) => {
                tracing::debug!(method = %event.method, "unsolicited event discarded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_counters_start_at_one_and_climb() {
        let mut ids = IdCounter::default();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn default_windows_are_sane() {
        let config = SessionConfig::default();
        assert!(config.announce_window > config.poll_interval);
        assert!(config.call_timeout >= config.list_window);
    }
}
