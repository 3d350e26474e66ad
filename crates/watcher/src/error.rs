//! Error types for the watch subsystem.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerKind;

/// Errors from registry, provider and controller operations.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Growing the subscription storage failed. There is no degraded mode
    /// for a watch list we could not extend, so callers treat this as fatal.
    #[error("Cannot grow watch subscription storage")]
    ResourceExhausted,

    #[error("Cannot watch directory {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("{kind} timer armed while another timer is pending")]
    TimerArmed { kind: TimerKind },

    #[error("Event channel closed unexpectedly")]
    ChannelClosed,

    #[error("Failed to initialize watcher: {0}")]
    Notify(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
