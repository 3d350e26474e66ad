//! Settings for the watcher process
//!
//! Built from defaults, an optional TOML file, and command-line overrides,
//! in that order of precedence (lowest first).
//!
//! ```toml
//! [watch]
//! repo_path = "."
//! timeout_secs = 30
//! settle = true
//! max_settle_windows = 10
//!
//! [commit]
//! touched_counting = "permissive"   # or "index-mutation"
//! ```

use autocommit::{CommitOptions, TouchedCounting};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use watcher::{ControllerOptions, DEFAULT_MAX_DEFERRALS};

pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 100_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Timeout value must be between 1s and 100000s (got {0})")]
    TimeoutOutOfRange(u64),

    #[error("Repository path must not be empty")]
    EmptyRepoPath,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub watch: WatchSettings,
    pub commit: CommitSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Directory to watch and commit (default: current directory)
    pub repo_path: PathBuf,

    /// Debounce window and retry interval in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait for writes to stop before committing (default: true)
    pub settle: bool,

    /// Extra windows the settle check may add before committing anyway
    /// (default: 10)
    pub max_settle_windows: u32,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            settle: true,
            max_settle_windows: DEFAULT_MAX_DEFERRALS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSettings {
    pub touched_counting: TouchedCounting,
}

impl Settings {
    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line values on top of the loaded settings
    pub fn apply_overrides(
        &mut self,
        repo_path: Option<PathBuf>,
        timeout_secs: Option<u64>,
        settle: Option<bool>,
    ) {
        if let Some(repo_path) = repo_path {
            self.watch.repo_path = repo_path;
        }
        if let Some(timeout_secs) = timeout_secs {
            self.watch.timeout_secs = timeout_secs;
        }
        if let Some(settle) = settle {
            self.watch.settle = settle;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.watch.timeout_secs) {
            return Err(ConfigError::TimeoutOutOfRange(self.watch.timeout_secs));
        }
        if self.watch.repo_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRepoPath);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.watch.timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            timeout: self.timeout(),
            settle: self.watch.settle,
            max_deferrals: self.watch.max_settle_windows,
        }
    }

    pub fn commit_options(&self, self_name: Option<String>) -> CommitOptions {
        CommitOptions {
            self_name,
            counting: self.commit.touched_counting,
        }
    }
}

/// clap value parser for `--timeout`
pub fn parse_timeout(value: &str) -> Result<u64, String> {
    let secs: u64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a whole number of seconds"))?;

    if (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(format!(
            "Timeout value must be between {MIN_TIMEOUT_SECS}s and {MAX_TIMEOUT_SECS}s"
        ))
    }
}
