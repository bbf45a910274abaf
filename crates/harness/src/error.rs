//! Harness error types

use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to launch {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("application exited during startup: {status}")]
    EarlyExit { status: std::process::ExitStatus },

    #[error("no window titled {title:?} within {timeout:?}")]
    WindowNotFound { title: String, timeout: Duration },

    #[error("{tool} could not be run: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {detail}")]
    ToolFailed { tool: &'static str, detail: String },

    #[error("element not found: {what}")]
    ElementNotFound { what: String },

    #[error("element {selector:?} did not appear within {timeout:?}")]
    ElementTimeout { selector: String, timeout: Duration },

    #[error("element {selector:?} still present after {timeout:?}")]
    ElementLingered { selector: String, timeout: Duration },

    #[error("unknown environment category {category:?}")]
    UnknownCategory { category: String },

    #[error("{operation} needs an inspector connection")]
    InspectorRequired { operation: &'static str },

    #[error("screenshot at {path:?} looks implausible ({bytes} bytes)")]
    SuspectScreenshot { path: PathBuf, bytes: u64 },

    #[error("scenario check failed: {check}")]
    CheckFailed { check: String },

    #[error(transparent)]
    Inspector(#[from] inspector::InspectorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
