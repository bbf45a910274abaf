//! Full-screen capture
//!
//! scrot does the work when present; ImageMagick's import is the
//! fallback. Captures under the plausibility floor are rejected since
//! a blank frame would let a broken run pass for a finished one.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{HarnessError, Result};
use crate::window::{self, Window};

/// Anything smaller than this is a blank frame, not a screenshot.
const MIN_PLAUSIBLE_BYTES: u64 = 10 * 1024;
/// Pause between parking the pointer and capturing.
const SETTLE: Duration = Duration::from_millis(300);

/// Fresh artifact directory for one run.
pub fn run_dir(base: &Path) -> PathBuf {
    base.join(format!("run-{}", Uuid::now_v7()))
}

/// Capture the whole screen into `dir/{name}.png`.
pub async fn capture(dir: &Path, name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{name}.png"));

    if let Err(error) = window::park_pointer().await {
        tracing::debug!(%error, "pointer park skipped");
    }
    tokio::time::sleep(SETTLE).await;

    if let Err(error) = scrot(&path).await {
        tracing::warn!(%error, "scrot failed, trying import");
        import(&path).await?;
    }

    let bytes = tokio::fs::metadata(&path).await?.len();
    if bytes < MIN_PLAUSIBLE_BYTES {
        return Err(HarnessError::SuspectScreenshot { path, bytes });
    }
    tracing::info!(path = %path.display(), bytes, "screenshot captured");
    Ok(path)
}

/// Capture with the app front and center: inspector windows get
/// minimized and focus pulled back first.
pub async fn capture_app(window: &Window, dir: &Path, name: &str) -> Result<PathBuf> {
    window::minimize_inspector_windows().await;
    window.focus().await;
    capture(dir, name).await
}

async fn scrot(path: &Path) -> Result<()> {
    run("scrot", &["--overwrite", &path.to_string_lossy()]).await
}

async fn import(path: &Path) -> Result<()> {
    run("import", &["-window", "root", &path.to_string_lossy()]).await
}

async fn run(tool: &'static str, args: &[&str]) -> Result<()> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|source| HarnessError::Tool { tool, source })?;
    if !output.status.success() {
        return Err(HarnessError::ToolFailed {
            tool,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
