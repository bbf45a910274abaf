//! Hosted workflow monitoring through the gh CLI

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use crate::git;

/// Workflow that builds the desktop artifacts for a tag.
pub const WORKFLOW: &str = "desktop-build.yml";

const POLL_INTERVAL: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_secs(40 * 60);
const LOOKUP_ATTEMPTS: u32 = 10;
const LOOKUP_PAUSE: Duration = Duration::from_secs(5);

/// Resolve the run id the pushed tag kicked off. The run takes a few
/// seconds to appear on the API, hence the retry.
pub fn find_run(tag: &str) -> Result<u64> {
    for attempt in 1..=LOOKUP_ATTEMPTS {
        let listing = git::run(
            "gh",
            &[
                "run",
                "list",
                "--workflow",
                WORKFLOW,
                "--limit",
                "10",
                "--json",
                "databaseId,headBranch,status",
            ],
        )?;
        let runs: Value = serde_json::from_str(&listing).context("parsing gh run list output")?;
        let found = runs
            .as_array()
            .into_iter()
            .flatten()
            .find(|run| run["headBranch"] == tag)
            .and_then(|run| run["databaseId"].as_u64());
        if let Some(id) = found {
            tracing::info!(id, tag, "workflow run located");
            return Ok(id);
        }
        tracing::debug!(attempt, tag, "run not listed yet");
        thread::sleep(LOOKUP_PAUSE);
    }
    bail!("no {WORKFLOW} run showed up for tag {tag}");
}

/// Poll the run until it completes, reporting each job transition.
pub fn monitor(run_id: u64) -> Result<()> {
    let started = Instant::now();
    let mut last_seen: HashMap<String, String> = HashMap::new();

    loop {
        if started.elapsed() > POLL_TIMEOUT {
            bail!("run {run_id} still going after {POLL_TIMEOUT:?}, giving up on it");
        }

        let body = git::run(
            "gh",
            &[
                "run",
                "view",
                &run_id.to_string(),
                "--json",
                "status,conclusion,jobs",
            ],
        )?;
        let run: Value = serde_json::from_str(&body).context("parsing gh run view output")?;

        for job in run["jobs"].as_array().into_iter().flatten() {
            let name = job["name"].as_str().unwrap_or("unnamed").to_string();
            let state = job_state(job);
            if last_seen.get(&name) != Some(&state) {
                println!("[{:>5}s] {name}: {state}", started.elapsed().as_secs());
                last_seen.insert(name, state);
            }
        }

        if run["status"] == "completed" {
            let conclusion = run["conclusion"].as_str().unwrap_or("unknown");
            if conclusion == "success" {
                println!("run {run_id} finished: success");
                return Ok(());
            }
            bail!("run {run_id} finished: {conclusion}");
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Job state, preferring the conclusion once one exists.
fn job_state(job: &Value) -> String {
    job["conclusion"]
        .as_str()
        .filter(|conclusion| !conclusion.is_empty())
        .or_else(|| job["status"].as_str())
        .unwrap_or("unknown")
        .to_string()
}
