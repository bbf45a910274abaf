//! Error types for the inspector client
//!
//! One flat enum for the whole crate. Timeouts and remote-reported
//! failures always reach the caller; framing noise never does.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InspectorError>;

#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("bootstrap page unreachable after {attempts} attempts: {last_error}")]
    DiscoveryTimeout { attempts: u32, last_error: String },

    #[error("bootstrap page contains no recognizable target path")]
    NoTargetPath,

    #[error("no debuggable target announced or listed")]
    NoTargetFound,

    #[error("timed out after {timeout:?} waiting for {waiting_on}")]
    Timeout { waiting_on: String, timeout: Duration },

    #[error("remote evaluation failed: {message}")]
    RemoteEvaluation { message: String },

    #[error("remote call failed: {message}")]
    RemoteCall { message: String },

    #[error("inspector protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("connection closed")]
    Closed,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
