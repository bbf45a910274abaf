//! WebSocket transport for the inspector connection
//!
//! Design decisions:
//! 1. One connection per session, owned outright - no reconnect, a dead
//!    socket kills the session
//! 2. No reader task and no pending map - frames are handed to the
//!    caller at explicit, deadline-bounded read points
//! 3. Exclusivity through &mut, correlation lives upstream

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};

use crate::error::{InspectorError, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Inbound ceiling. Serialized DOM and evaluation results can run to
/// tens of megabytes.
pub const MAX_MESSAGE_BYTES: usize = 32 * 1024 * 1024;

/// Single long-lived connection carrying JSON text frames.
#[derive(Debug)]
pub struct Transport {
    sink: WsSink,
    source: WsSource,
}

impl Transport {
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(MAX_MESSAGE_BYTES);
        config.max_frame_size = Some(MAX_MESSAGE_BYTES);

        let (stream, _) = connect_async_with_config(ws_url, Some(config), false).await?;
        let (sink, source) = stream.split();
        tracing::debug!(url = ws_url, "inspector socket open");
        Ok(Self { sink, source })
    }

    /// Fire-and-forget write of one text frame.
    pub async fn send(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Next text frame, waiting at most `max_wait`.
    ///
    /// Pings are answered by the library during the read; binary and
    /// control frames are skipped without resetting the clock. A closed
    /// stream is fatal.
    pub async fn receive(&mut self, max_wait: Duration) -> Result<String> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            let message = tokio::time::timeout_at(deadline, self.source.next())
                .await
                .map_err(|_| InspectorError::Timeout {
                    waiting_on: "inbound frame".to_string(),
                    timeout: max_wait,
                })?;
            match message {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(_))) | None => return Err(InspectorError::Closed),
                Some(Ok(_)) => {
                    tracing::trace!("skipping non-text frame");
                }
                Some(Err(error)) => return Err(InspectorError::WebSocket(error)),
            }
        }
    }
}
