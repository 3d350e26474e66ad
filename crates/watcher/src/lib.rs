//! File system watching for gwatch
//!
//! This crate provides:
//! - A registry of directory subscriptions torn down in one sweep
//! - A notify-backed watch provider (per-directory or natively recursive)
//! - One-shot debounce/retry timers
//! - The Retrying / Watching / Debouncing controller loop

pub mod controller;
pub mod error;
pub mod platform;
pub mod provider;
pub mod registry;
pub mod settle;
pub mod timer;

pub use controller::{
    Committer, Controller, ControllerOptions, ControllerState, DEFAULT_MAX_DEFERRALS,
};
pub use error::{Result, WatchError};
pub use provider::{NotifyProvider, WatchMode, WatchProvider};
pub use registry::WatchRegistry;
pub use timer::{OneShotTimer, TimerKind};

use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// File system event
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
    /// Registry generation of the subscription that saw the change
    pub generation: u64,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed
    Rename,
    /// Backend could not classify the change
    Other,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Create => "created",
            EventKind::Modify => "changed",
            EventKind::Delete => "deleted",
            EventKind::Rename => "(re)moved",
            EventKind::Other => "touched",
        };
        f.write_str(name)
    }
}

/// Where a subscription delivers its events.
///
/// Every subscription made during one `WatchRegistry::subscribe` sweep shares
/// the same generation, so the controller can drop events that arrive after
/// the sweep was torn down.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<WatchEvent>,
    generation: u64,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<WatchEvent>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forward an event. A closed receiver means the controller is gone,
    /// which only happens during shutdown, so the event is dropped.
    pub fn send(&self, path: PathBuf, kind: EventKind) {
        let _ = self.tx.send(WatchEvent {
            path,
            kind,
            generation: self.generation,
        });
    }
}
