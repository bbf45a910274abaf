//! End-to-end harness for the Ambience desktop application
//!
//! Process lifecycle, window control, screenshot capture, and a UI
//! driving layer that prefers the inspector connection and degrades to
//! simulated keyboard input when the debug endpoint is unavailable.

pub mod app;
pub mod error;
pub mod scenario;
pub mod screenshot;
pub mod ui;
pub mod window;

pub use app::{App, AppConfig};
pub use error::{HarnessError, Result};
pub use scenario::{ScenarioConfig, ScenarioReport, ScenarioStatus};
pub use ui::{TimeOfDay, UiDriver};
pub use window::{Window, WindowConfig};
