//! One-shot timers for the debounce and retry windows
//!
//! A timer is armed once, fires once, and is then disarmed. Arming a timer
//! that is still pending is an error rather than a silent reset.

use crate::error::{Result, WatchError};
use std::fmt;
use std::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Sleep;

/// Which logical timer a `OneShotTimer` represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Debounce,
    Retry,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Debounce => f.write_str("debounce"),
            TimerKind::Retry => f.write_str("retry"),
        }
    }
}

/// Single-shot timer on the tokio clock
#[derive(Debug)]
pub struct OneShotTimer {
    kind: TimerKind,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl OneShotTimer {
    pub fn new(kind: TimerKind) -> Self {
        Self { kind, sleep: None }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Arm the timer to fire once after `duration`.
    pub fn arm(&mut self, duration: Duration) -> Result<()> {
        if self.is_armed() {
            return Err(WatchError::TimerArmed { kind: self.kind });
        }
        self.sleep = Some(Box::pin(tokio::time::sleep(duration)));
        Ok(())
    }

    /// Wait for the armed timer to fire, then disarm it.
    ///
    /// Pends forever when nothing is armed. Cancel safe: dropping the future
    /// before it completes leaves the timer armed with its original deadline.
    pub async fn expired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => future::pending::<()>().await,
        }
        self.sleep = None;
    }
}
