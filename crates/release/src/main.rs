//! Desktop release driver
//!
//! Bumps the app's version, commits and tags it, pushes, and watches
//! the hosted build that the tag kicks off.

mod git;
mod version;
mod workflow;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use version::{Part, Version};

#[derive(Parser, Debug)]
#[command(name = "release", about = "Cut and monitor a desktop release", version)]
#[command(group(
    ArgGroup::new("action")
        .args(["patch", "minor", "major", "set", "monitor_only"])
        .required(true)
))]
struct Args {
    /// Bump the patch part.
    #[arg(long)]
    patch: bool,
    /// Bump the minor part and reset patch.
    #[arg(long)]
    minor: bool,
    /// Bump the major part and reset minor and patch.
    #[arg(long)]
    major: bool,
    /// Use this exact version instead of bumping.
    #[arg(long, value_name = "X.Y.Z")]
    set: Option<String>,
    /// Skip releasing and just watch an existing tag's build.
    #[arg(long, value_name = "TAG")]
    monitor_only: Option<String>,

    /// Show what would happen without touching anything.
    #[arg(long)]
    dry_run: bool,
    /// Tag and push but do not wait for the build.
    #[arg(long)]
    no_monitor: bool,
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,

    /// App config carrying the version field.
    #[arg(long, default_value = "desktop/tauri.conf.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    if let Some(tag) = &args.monitor_only {
        let run_id = workflow::find_run(tag)?;
        return workflow::monitor(run_id);
    }

    let current = version::read(&args.config)?;
    let next = match (&args.set, Part::from_flags(args.patch, args.minor, args.major)) {
        (Some(text), None) => Version::parse(text)?,
        (None, Some(part)) => current.bump(part),
        _ => bail!("pick exactly one of --patch, --minor, --major, or --set"),
    };
    let tag = next.tag();
    println!("release: {current} -> {next} (tag {tag})");

    if args.dry_run {
        println!("dry run, stopping before any changes");
        return Ok(());
    }

    let problems = git::preflight()?;
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  - {problem}");
        }
        bail!("{} preflight check(s) failed", problems.len());
    }
    if git::tag_exists(&tag)? {
        bail!("tag {tag} already exists");
    }

    if !args.yes && !confirm(&format!("tag and push {tag}?"))? {
        println!("aborted");
        return Ok(());
    }

    version::write(&args.config, next)?;
    let config_path = args.config.to_string_lossy();
    git::commit_and_tag(&config_path, &next.to_string(), &tag)?;
    git::push_with_tags()?;
    println!("pushed {tag}");

    if args.no_monitor {
        println!("not waiting for the build (--no-monitor)");
        return Ok(());
    }
    let run_id = workflow::find_run(&tag)?;
    workflow::monitor(run_id)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
