//! Git and GitHub CLI plumbing

use anyhow::{bail, Context, Result};
use std::process::Command;

/// Run a command and hand back trimmed stdout, failing loudly with the
/// command line and stderr on a nonzero exit.
pub fn run(program: &str, args: &[&str]) -> Result<String> {
    let rendered = if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    };
    tracing::debug!(command = %rendered, "running");

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("could not run `{rendered}`"))?;
    if !output.status.success() {
        bail!(
            "`{rendered}` exited {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Every release precondition, checked together so the operator sees
/// the whole list at once instead of fixing them one rerun at a time.
pub fn preflight() -> Result<Vec<String>> {
    let mut problems = Vec::new();

    let branch = run("git", &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if branch != "main" {
        problems.push(format!("on branch {branch:?}, releases are cut from main"));
    }

    let dirty = run("git", &["status", "--porcelain"])?;
    if !dirty.is_empty() {
        problems.push(format!("working tree has uncommitted changes:\n{dirty}"));
    }

    run("git", &["fetch", "origin", "main"])?;
    let behind = run("git", &["rev-list", "--count", "HEAD..origin/main"])?;
    if behind != "0" {
        problems.push(format!("{behind} commit(s) behind origin/main, pull first"));
    }

    if let Err(error) = run("gh", &["auth", "status"]) {
        problems.push(format!("gh is missing or unauthenticated: {error}"));
    }

    Ok(problems)
}

/// True when `tag` exists locally or on origin.
pub fn tag_exists(tag: &str) -> Result<bool> {
    let local = run("git", &["tag", "--list", tag])?;
    if !local.is_empty() {
        return Ok(true);
    }
    let remote = run("git", &["ls-remote", "--tags", "origin", tag])?;
    Ok(!remote.is_empty())
}

/// Commit the config bump and lay the annotated release tag on it.
pub fn commit_and_tag(config_path: &str, version: &str, tag: &str) -> Result<()> {
    run("git", &["add", config_path])?;
    run(
        "git",
        &["commit", "-m", &format!("bump desktop version to {version}")],
    )?;
    run(
        "git",
        &["tag", "-a", tag, "-m", &format!("Desktop release {version}")],
    )?;
    Ok(())
}

/// Push main together with the new tag.
pub fn push_with_tags() -> Result<()> {
    run("git", &["push", "origin", "main", "--follow-tags"])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_hands_back_trimmed_stdout() {
        assert_eq!(run("echo", &["hello"]).unwrap(), "hello");
    }

    #[test]
    fn failures_name_the_command() {
        let message = run("false", &[]).unwrap_err().to_string();
        assert!(message.contains("`false`"), "got: {message}");
        assert!(message.contains("exited"), "got: {message}");
    }
}
