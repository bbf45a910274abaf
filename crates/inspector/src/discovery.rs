//! Bootstrap-page discovery
//!
//! The inspector serves an HTML listing of debuggable pages; the
//! connection path gets scraped out of it. Patterns are tried strictly
//! in priority order, most structured first, so a page listing several
//! link styles resolves deterministically.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use url::Url;

use crate::error::{InspectorError, Result};

/// Capture-group patterns for the connection path, in priority order.
static TARGET_PATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(/socket/\d+/\d+/\w+)",
        r#"href=["'](/Main/\d+)["']"#,
        r#"href=["'](/Page/\d+)["']"#,
        r#"href=["'](/inspector/\d+)["']"#,
        r#"href=["']([^"']*?/\d+)["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("target path pattern must compile"))
    .collect()
});

/// Last resort: a raw socket URL anywhere in the page, used verbatim.
static WS_URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"ws://[^"'>\s]+"#).expect("ws url pattern must compile"));

/// Resolved connection endpoint. Discovered, never configured, and
/// stale as soon as the remote process restarts.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Path fragment scraped from the bootstrap page, or a full ws:// URL.
    pub target_path: String,
}

impl Endpoint {
    /// URL for the debug connection.
    pub fn ws_url(&self) -> String {
        if self.target_path.starts_with("ws://") || self.target_path.starts_with("wss://") {
            self.target_path.clone()
        } else {
            format!("ws://{}:{}{}", self.host, self.port, self.target_path)
        }
    }
}

/// Bootstrap fetch tuning. Defaults give a slow desktop app time to
/// bring its inspector server up.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub host: String,
    pub port: u16,
    pub attempts: u32,
    pub backoff: Duration,
    pub fetch_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            attempts: 15,
            backoff: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(3),
        }
    }
}

/// Scan a bootstrap page for a connection path.
pub fn find_target_path(html: &str) -> Option<String> {
    for pattern in TARGET_PATH_PATTERNS.iter() {
        if let Some(found) = pattern.captures(html).and_then(|captures| captures.get(1)) {
            return Some(found.as_str().to_string());
        }
    }
    WS_URL_PATTERN
        .find(html)
        .map(|found| found.as_str().to_string())
}

/// Fetch the bootstrap page until a connection path shows up.
///
/// `DiscoveryTimeout` when the page never answered across the allowed
/// attempts; `NoTargetPath` when it answered but no pattern ever matched.
pub async fn discover(config: &DiscoveryConfig) -> Result<Endpoint> {
    let base = Url::parse(&format!("http://{}:{}/", config.host, config.port))?;
    let client = reqwest::Client::builder()
        .timeout(config.fetch_timeout)
        .build()?;

    let mut page_seen = false;
    let mut last_error = String::from("no attempt made");
    for attempt in 1..=config.attempts {
        match client.get(base.clone()).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => {
                    page_seen = true;
                    if let Some(path) = find_target_path(&body) {
                        tracing::info!(%path, attempt, "resolved inspector target path");
                        return Ok(Endpoint {
                            host: config.host.clone(),
                            port: config.port,
                            target_path: path,
                        });
                    }
                    tracing::debug!(attempt, bytes = body.len(), "page has no target path yet");
                }
                Err(error) => {
                    last_error = error.to_string();
                    tracing::debug!(attempt, %error, "bootstrap body read failed");
                }
            },
            Err(error) => {
                last_error = error.to_string();
                tracing::debug!(attempt, %error, "bootstrap fetch failed");
            }
        }
        if attempt < config.attempts {
            tokio::time::sleep(config.backoff).await;
        }
    }

    if page_seen {
        Err(InspectorError::NoTargetPath)
    } else {
        Err(InspectorError::DiscoveryTimeout {
            attempts: config.attempts,
            last_error,
        })
    }
}
