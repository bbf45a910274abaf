//! Window placement and input over xdotool
//!
//! The app window is located by title and arranged before the run.
//! Placement and input must succeed; focus, raise, and activation are
//! best effort because headless X servers often run without a window
//! manager to honor them.

use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

use crate::error::{HarnessError, Result};

/// Pause between pulling focus and sending input.
const FOCUS_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    /// Bound on the window showing up after launch.
    pub appear_timeout: Duration,
    pub poll: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ambience".to_string(),
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
            appear_timeout: Duration::from_secs(30),
            poll: Duration::from_millis(500),
        }
    }
}

/// One located X window.
#[derive(Debug, Clone)]
pub struct Window {
    id: String,
    title: String,
}

impl Window {
    /// Poll for a window carrying `config.title` until it shows up.
    pub async fn wait_for(config: &WindowConfig) -> Result<Self> {
        let deadline = Instant::now() + config.appear_timeout;
        loop {
            let ids = search_all(&config.title).await?;
            if let Some(id) = ids.into_iter().next() {
                tracing::info!(%id, title = %config.title, "application window located");
                return Ok(Self {
                    id,
                    title: config.title.clone(),
                });
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::WindowNotFound {
                    title: config.title.clone(),
                    timeout: config.appear_timeout,
                });
            }
            tokio::time::sleep(config.poll).await;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Size and place the window, then pull focus.
    pub async fn prepare(&self, config: &WindowConfig) -> Result<()> {
        let width = config.width.to_string();
        let height = config.height.to_string();
        let x = config.x.to_string();
        let y = config.y.to_string();
        xdotool(&["windowsize", &self.id, &width, &height]).await?;
        xdotool(&["windowmove", &self.id, &x, &y]).await?;
        self.focus().await;
        Ok(())
    }

    /// Best-effort focus, raise, and activation.
    pub async fn focus(&self) {
        for action in [
            vec!["windowactivate", self.id.as_str()],
            vec!["windowraise", self.id.as_str()],
            vec!["windowfocus", "--sync", self.id.as_str()],
        ] {
            if let Err(error) = xdotool(&action).await {
                tracing::warn!(%error, "window focus step skipped");
            }
        }
    }

    /// Send a key chord. Focus is pulled first and the chord goes to
    /// whatever holds focus: addressing `xdotool key` with `--window`
    /// can bypass GTK's input routing into the WebView.
    pub async fn key(&self, combo: &str) -> Result<()> {
        self.focus().await;
        tokio::time::sleep(FOCUS_SETTLE).await;
        xdotool(&key_args(combo)).await?;
        Ok(())
    }

    /// Type literal text with a small inter-key delay. Focused-window
    /// delivery, same as [`Window::key`].
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.focus().await;
        tokio::time::sleep(FOCUS_SETTLE).await;
        xdotool(&type_args(text)).await?;
        Ok(())
    }

    pub async fn minimize(&self) -> Result<()> {
        xdotool(&["windowminimize", &self.id]).await?;
        Ok(())
    }
}

/// Drop any inspector UI out of the way before a capture.
pub async fn minimize_inspector_windows() {
    for title in ["Web Inspector", "Remote Inspector"] {
        let ids = match search_all(title).await {
            Ok(ids) => ids,
            Err(error) => {
                tracing::debug!(%error, "inspector window search skipped");
                continue;
            }
        };
        for id in ids {
            let overlay = Window {
                id,
                title: title.to_string(),
            };
            if let Err(error) = overlay.minimize().await {
                tracing::debug!(%error, id = %overlay.id, "inspector window left in place");
            }
        }
    }
}

/// Move the pointer into the corner so it stays out of captures.
pub async fn park_pointer() -> Result<()> {
    xdotool(&["mousemove", "1", "1"]).await?;
    Ok(())
}

fn key_args(combo: &str) -> [&str; 3] {
    ["key", "--clearmodifiers", combo]
}

fn type_args(text: &str) -> [&str; 4] {
    ["type", "--delay", "50", text]
}

async fn xdotool(args: &[&str]) -> Result<String> {
    let output = Command::new("xdotool")
        .args(args)
        .output()
        .await
        .map_err(|source| HarnessError::Tool {
            tool: "xdotool",
            source,
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HarnessError::ToolFailed {
            tool: "xdotool",
            detail: format!("{}: {}", args.join(" "), stderr.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// All window ids matching a title. `search` exits nonzero on no
/// match, which is not an error here.
async fn search_all(title: &str) -> Result<Vec<String>> {
    let output = Command::new("xdotool")
        .args(["search", "--name", title])
        .output()
        .await
        .map_err(|source| HarnessError::Tool {
            tool: "xdotool",
            source,
        })?;
    if !output.status.success() {
        return Ok(Vec::new());
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
