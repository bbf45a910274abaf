//! Application process lifecycle
//!
//! Spawns the binary under test with the inspector environment wired
//! up, forwards its output into tracing, and tears it down with a
//! SIGTERM grace window before resorting to SIGKILL.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub binary: PathBuf,
    /// Window title the app comes up with.
    pub title: String,
    pub inspector_host: String,
    pub inspector_port: u16,
    /// RUST_LOG value handed to the child.
    pub log_filter: String,
    /// Grace period before the child is expected to be alive and settled.
    pub startup_wait: Duration,
    /// How long SIGTERM gets before SIGKILL.
    pub grace: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("target/release/ambience"),
            title: "Ambience".to_string(),
            inspector_host: "127.0.0.1".to_string(),
            inspector_port: 3030,
            log_filter: "info".to_string(),
            startup_wait: Duration::from_secs(2),
            grace: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// Bind address handed to the inspector server inside the app.
    pub fn inspector_address(&self) -> String {
        format!("{}:{}", self.inspector_host, self.inspector_port)
    }
}

/// One running instance of the application under test.
#[derive(Debug)]
pub struct App {
    child: Child,
    config: AppConfig,
}

impl App {
    /// Spawn the application with the inspector enabled. The legacy
    /// inspector variable is scrubbed so only the HTTP server comes up.
    pub async fn launch(config: AppConfig) -> Result<Self> {
        let mut command = Command::new(&config.binary);
        command
            .env("WEBKIT_INSPECTOR_HTTP_SERVER", config.inspector_address())
            .env_remove("WEBKIT_INSPECTOR_SERVER")
            .env("RUST_LOG", &config.log_filter)
            .env("GTK_A11Y", "none")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            binary: config.binary.clone(),
            source,
        })?;
        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }
        tracing::info!(binary = ?config.binary, pid = child.id(), "application launched");

        tokio::time::sleep(config.startup_wait).await;
        if let Some(status) = child.try_wait()? {
            return Err(HarnessError::EarlyExit { status });
        }
        Ok(Self { child, config })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the app to exit, wait out the grace period, then kill it.
    pub async fn stop(mut self) -> Result<()> {
        let Some(pid) = self.child.id() else {
            let status = self.child.wait().await?;
            tracing::debug!(%status, "application had already exited");
            return Ok(());
        };

        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)?;
        tracing::debug!(pid, "sent SIGTERM, waiting for a clean exit");

        let deadline = Instant::now() + self.config.grace;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                tracing::info!(%status, "application exited");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tracing::warn!(pid, "application ignored SIGTERM, killing it");
        self.child.kill().await?;
        Ok(())
    }
}

fn forward_output<R>(stream: R, label: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(stream = label, "{line}");
        }
    });
}
