//! Helpers for running the `gwatch` binary
//!
//! `GwatchCommand` runs the binary to completion (argument errors),
//! `GwatchProcess` keeps a watcher running in the background and kills it on
//! drop.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Command builder for a one-shot run
pub struct GwatchCommand {
    args: Vec<String>,
    lock_dir: PathBuf,
}

impl GwatchCommand {
    /// Lock files go under `lock_dir` instead of the user's runtime dir
    pub fn new(lock_dir: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            lock_dir: lock_dir.as_ref().to_path_buf(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Run to completion and capture output
    pub fn execute(&self) -> Result<CommandResult> {
        let output = base_command(&self.lock_dir)
            .args(&self.args)
            .output()
            .context("Failed to execute gwatch")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Background watcher, killed when dropped
pub struct GwatchProcess {
    child: Child,
}

impl GwatchProcess {
    pub fn spawn(lock_dir: impl AsRef<Path>, args: &[&str]) -> Result<Self> {
        let child = base_command(lock_dir.as_ref())
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn gwatch")?;

        Ok(Self { child })
    }

    /// Whether the process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for GwatchProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll `condition` every 100ms until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    condition()
}

fn base_command(lock_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_gwatch"));
    command
        .env("XDG_RUNTIME_DIR", lock_dir)
        .env("RUST_LOG", "debug")
        .stdin(Stdio::null());
    command
}
