//! The canonical smoke scenario
//!
//! Launch, find the window, pick the richest driver available, start
//! an environment at a time of day, confirm what is playing, and leave
//! a screenshot behind. Failures still produce a capture and a state
//! dump before the app is torn down.

use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::{App, AppConfig};
use crate::error::{HarnessError, Result};
use crate::screenshot;
use crate::ui::{self, TimeOfDay, UiDriver, CATEGORY_LIST, NOW_PLAYING_STATUS};
use crate::window::{Window, WindowConfig};
use inspector::SessionConfig;

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Used for the screenshot file name.
    pub name: String,
    pub app: AppConfig,
    pub window: WindowConfig,
    pub session: SessionConfig,
    pub category: String,
    pub environment: String,
    pub time: TimeOfDay,
    /// Bound on the UI appearing after launch.
    pub ui_timeout: Duration,
    /// Bound on one bridged command.
    pub command_timeout: Duration,
    /// Bound on the now-playing confirmation.
    pub confirm_timeout: Duration,
    /// Pause before the final capture.
    pub settle: Duration,
    pub screenshot_base: PathBuf,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "travel-afternoon".to_string(),
            app: AppConfig::default(),
            window: WindowConfig::default(),
            session: SessionConfig::default(),
            category: "travel".to_string(),
            environment: "Travel".to_string(),
            time: TimeOfDay::Afternoon,
            ui_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(90),
            confirm_timeout: Duration::from_secs(15),
            settle: Duration::from_secs(2),
            screenshot_base: PathBuf::from("screenshots"),
        }
    }
}

/// How far the run got vouched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    /// The page itself confirmed the environment is playing.
    Confirmed,
    /// Driven blind; the screenshot is the only evidence.
    Unverified,
}

#[derive(Debug)]
pub struct ScenarioReport {
    pub driver: &'static str,
    pub status: ScenarioStatus,
    pub screenshot: PathBuf,
    pub now_playing: Option<String>,
}

pub async fn run(config: ScenarioConfig) -> Result<ScenarioReport> {
    let run_dir = screenshot::run_dir(&config.screenshot_base);
    tracing::info!(name = %config.name, dir = %run_dir.display(), "scenario starting");

    let app = App::launch(config.app.clone()).await?;
    let outcome = drive(&config, &run_dir).await;

    if let Err(error) = &outcome {
        tracing::error!(%error, "scenario failed, capturing what the screen shows");
        if let Err(capture_error) = screenshot::capture(&run_dir, "failure").await {
            tracing::warn!(%capture_error, "diagnostic capture failed too");
        }
    }

    if let Err(error) = app.stop().await {
        tracing::warn!(%error, "application shutdown was unclean");
    }
    outcome
}

async fn drive(config: &ScenarioConfig, run_dir: &Path) -> Result<ScenarioReport> {
    let window = Window::wait_for(&config.window).await?;
    window.prepare(&config.window).await?;

    let mut driver = ui::connect(config.session.clone(), &window).await;
    tracing::info!(driver = driver.name(), "driver selected");

    let outcome = steps(driver.as_mut(), config, &window, run_dir).await;
    if outcome.is_err() {
        match driver.dump_state().await {
            Ok(state) => tracing::info!(%state, "page state at failure"),
            Err(error) => tracing::debug!(%error, "no page state available"),
        }
    }
    outcome
}

async fn steps(
    driver: &mut dyn UiDriver,
    config: &ScenarioConfig,
    window: &Window,
    run_dir: &Path,
) -> Result<ScenarioReport> {
    let status = drive_ui(driver, config).await?;

    tokio::time::sleep(config.settle).await;
    let shot = screenshot::capture_app(window, run_dir, &config.name).await?;
    let now_playing = driver.element_text(NOW_PLAYING_STATUS).await.ok();

    tracing::info!(
        driver = driver.name(),
        ?status,
        shot = %shot.display(),
        "scenario finished"
    );
    Ok(ScenarioReport {
        driver: driver.name(),
        status,
        screenshot: shot,
        now_playing,
    })
}

/// Walk the UI to the target environment. Every path opens the
/// category first, since the final capture is expected to show it
/// highlighted; only how the environment starts depends on the
/// driver's capabilities.
async fn drive_ui(driver: &mut dyn UiDriver, config: &ScenarioConfig) -> Result<ScenarioStatus> {
    driver
        .wait_for_element(CATEGORY_LIST, config.ui_timeout)
        .await?;
    driver.open_category(&config.category).await?;

    if driver.can_invoke() {
        let value = driver
            .invoke(
                "start_environment_with_time",
                json!({ "configName": config.environment, "time": config.time.arg() }),
                config.command_timeout,
            )
            .await?;
        tracing::info!(%value, environment = %config.environment, "environment started over the bridge");
    } else {
        driver.start_environment(&config.environment).await?;
        driver.select_time(config.time).await?;
    }

    let confirmed = driver
        .wait_for_text(NOW_PLAYING_STATUS, &config.environment, config.confirm_timeout)
        .await?;
    if confirmed {
        Ok(ScenarioStatus::Confirmed)
    } else if driver.can_observe() {
        Err(HarnessError::CheckFailed {
            check: format!(
                "now-playing never showed {:?} within {:?}",
                config.environment, config.confirm_timeout
            ),
        })
    } else {
        Ok(ScenarioStatus::Unverified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    #[test]
    fn default_scenario_targets_travel_afternoon() {
        let config = ScenarioConfig::default();
        assert_eq!(config.category, "travel");
        assert_eq!(config.environment, "Travel");
        assert_eq!(config.time, TimeOfDay::Afternoon);
        assert!(config.command_timeout > config.confirm_timeout);
    }

    /// Records every call so the step order can be asserted.
    struct ScriptedUi {
        calls: Vec<String>,
        invokable: bool,
        confirms: bool,
    }

    impl ScriptedUi {
        fn new(invokable: bool, confirms: bool) -> Self {
            Self {
                calls: Vec::new(),
                invokable,
                confirms,
            }
        }
    }

    #[async_trait]
    impl UiDriver for ScriptedUi {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn can_invoke(&self) -> bool {
            self.invokable
        }

        fn can_observe(&self) -> bool {
            self.invokable
        }

        async fn open_category(&mut self, category: &str) -> Result<()> {
            self.calls.push(format!("open_category {category}"));
            Ok(())
        }

        async fn start_environment(&mut self, environment: &str) -> Result<()> {
            self.calls.push(format!("start_environment {environment}"));
            Ok(())
        }

        async fn select_time(&mut self, time: TimeOfDay) -> Result<()> {
            self.calls.push(format!("select_time {}", time.arg()));
            Ok(())
        }

        async fn element_text(&mut self, selector: &str) -> Result<String> {
            self.calls.push(format!("element_text {selector}"));
            Ok(String::new())
        }

        async fn wait_for_element(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
            self.calls.push(format!("wait_for_element {selector}"));
            Ok(())
        }

        async fn wait_for_absence(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
            self.calls.push(format!("wait_for_absence {selector}"));
            Ok(())
        }

        async fn wait_for_text(
            &mut self,
            selector: &str,
            needle: &str,
            _timeout: Duration,
        ) -> Result<bool> {
            self.calls.push(format!("wait_for_text {selector} {needle}"));
            Ok(self.confirms)
        }

        async fn invoke(
            &mut self,
            command: &str,
            _args: Value,
            _timeout: Duration,
        ) -> Result<Value> {
            self.calls.push(format!("invoke {command}"));
            Ok(Value::Null)
        }

        async fn dump_state(&mut self) -> Result<Value> {
            self.calls.push("dump_state".to_string());
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn bridge_path_opens_the_category_before_invoking() {
        let mut driver = ScriptedUi::new(true, true);
        let status = drive_ui(&mut driver, &ScenarioConfig::default())
            .await
            .unwrap();
        assert_eq!(status, ScenarioStatus::Confirmed);
        assert_eq!(
            driver.calls,
            [
                "wait_for_element .category-list",
                "open_category travel",
                "invoke start_environment_with_time",
                "wait_for_text .now-playing-status Travel",
            ]
        );
    }

    #[tokio::test]
    async fn keyboard_path_walks_category_environment_time() {
        let mut driver = ScriptedUi::new(false, false);
        let status = drive_ui(&mut driver, &ScenarioConfig::default())
            .await
            .unwrap();
        assert_eq!(status, ScenarioStatus::Unverified);
        assert_eq!(
            driver.calls,
            [
                "wait_for_element .category-list",
                "open_category travel",
                "start_environment Travel",
                "select_time afternoon",
                "wait_for_text .now-playing-status Travel",
            ]
        );
    }

    #[tokio::test]
    async fn an_observing_driver_must_see_the_confirmation() {
        let mut driver = ScriptedUi::new(true, false);
        let outcome = drive_ui(&mut driver, &ScenarioConfig::default()).await;
        assert!(matches!(outcome, Err(HarnessError::CheckFailed { .. })));
    }
}
