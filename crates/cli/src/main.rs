//! gwatch - commit every change in a directory to its Git repository

use anyhow::Result;
use clap::Parser;
use cli_lib::config::{self, Settings};
use cli_lib::locks::{default_lock_dir, InstanceLock};
use cli_lib::{daemon, logging};
use std::path::{Path, PathBuf};

/// Watch a directory and auto-commit every change to its Git repository
#[derive(Parser)]
#[command(name = "gwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository directory to watch (default: current directory)
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Seconds to wait after a change before committing, and between
    /// retries while the directory is missing (1-100000, default: 30)
    #[arg(short, long, value_parser = config::parse_timeout)]
    timeout: Option<u64>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Commit as soon as the timeout expires, even if writes are still landing
    #[arg(long)]
    no_settle: bool,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_overrides(cli.repo, cli.timeout, cli.no_settle.then_some(false));
    settings.validate()?;

    let _lock = InstanceLock::acquire(&default_lock_dir(), &settings.watch.repo_path)?;

    daemon::run(&settings, program_name()).await
}

/// File name this binary was invoked as, excluded from every commit
fn program_name() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    Path::new(&arg0)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
}
