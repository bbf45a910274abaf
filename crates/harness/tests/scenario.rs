//! Live smoke run. Needs a display, xdotool, scrot, and a release
//! build of the application, so it only runs with --ignored.

use harness::scenario::{self, ScenarioConfig};
use tracing_subscriber::EnvFilter;

#[tokio::test]
#[ignore]
async fn travel_afternoon_runs_end_to_end() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let report = scenario::run(ScenarioConfig::default()).await.unwrap();
    assert!(report.screenshot.exists());
}
