//! UI driving, polymorphic over what the run has to work with
//!
//! Two capability sets exist. The inspector path evaluates DOM
//! expressions and can both act and observe; the keyboard path acts
//! blind through simulated input, so its waits degrade to sleeps and
//! its reads are refused. Losing the debug channel loses
//! observability, not capability.

pub mod inspector;
pub mod keyboard;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use self::inspector::InspectorDriver;
use self::keyboard::KeyboardDriver;
use crate::error::Result;
use crate::window::Window;
use ::inspector::{InspectorSession, SessionConfig};

/// Selector the scenario waits on before driving anything.
pub const CATEGORY_LIST: &str = ".category-list";
/// Selector carrying the currently playing environment's name.
pub const NOW_PLAYING_STATUS: &str = ".now-playing-status";

/// Time-of-day choice offered by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Daytime,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Label as rendered in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Daytime => "Daytime",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        }
    }

    /// Form the application's command surface expects.
    pub fn arg(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Daytime => "daytime",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "morning" => Some(TimeOfDay::Morning),
            "daytime" => Some(TimeOfDay::Daytime),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "evening" => Some(TimeOfDay::Evening),
            _ => None,
        }
    }
}

/// One way of driving the application's UI.
#[async_trait]
pub trait UiDriver: Send {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Whether bridged application commands are reachable.
    fn can_invoke(&self) -> bool;

    /// Whether page state can actually be read back.
    fn can_observe(&self) -> bool;

    async fn open_category(&mut self, category: &str) -> Result<()>;
    async fn start_environment(&mut self, environment: &str) -> Result<()>;
    async fn select_time(&mut self, time: TimeOfDay) -> Result<()>;

    async fn element_text(&mut self, selector: &str) -> Result<String>;
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()>;
    async fn wait_for_absence(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// True once `selector`'s text contains `needle`, false at the
    /// deadline. The keyboard path sleeps and reports false.
    async fn wait_for_text(
        &mut self,
        selector: &str,
        needle: &str,
        timeout: Duration,
    ) -> Result<bool>;

    /// Call a named application command through the bridge.
    async fn invoke(&mut self, command: &str, args: Value, timeout: Duration) -> Result<Value>;

    /// Gather whatever diagnostic state the path can see and log it.
    async fn dump_state(&mut self) -> Result<Value>;
}

/// Pick the richest driver the environment supports: the inspector
/// bridge when the debug endpoint answers, simulated keyboard input
/// against `window` otherwise.
pub async fn connect(session: SessionConfig, window: &Window) -> Box<dyn UiDriver> {
    match InspectorSession::connect(session).await {
        Ok(session) => {
            tracing::info!("driving the UI over the inspector connection");
            Box::new(InspectorDriver::new(session))
        }
        Err(error) => {
            tracing::warn!(%error, "inspector unavailable, falling back to keyboard input");
            Box::new(KeyboardDriver::new(window.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TIMES: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Daytime,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
    ];

    #[test]
    fn time_parsing_is_case_insensitive() {
        assert_eq!(TimeOfDay::parse("Afternoon"), Some(TimeOfDay::Afternoon));
        assert_eq!(TimeOfDay::parse("MORNING"), Some(TimeOfDay::Morning));
        assert_eq!(TimeOfDay::parse("noon"), None);
    }

    #[test]
    fn command_args_are_lowercased_labels() {
        for time in ALL_TIMES {
            assert_eq!(time.label().to_lowercase(), time.arg());
        }
    }
}
