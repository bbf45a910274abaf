//! Runs the travel-afternoon smoke scenario against a local build.
//!
//! Expects the application binary at target/release/ambience and a
//! display with xdotool and scrot available.

use harness::scenario::{self, ScenarioConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let report = scenario::run(ScenarioConfig::default()).await?;

    println!("driver:      {}", report.driver);
    println!("status:      {:?}", report.status);
    println!("screenshot:  {}", report.screenshot.display());
    if let Some(now_playing) = report.now_playing {
        println!("now playing: {now_playing}");
    }
    Ok(())
}
