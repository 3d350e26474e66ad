//! Watch controller
//!
//! Drives the Retrying / Watching / Debouncing cycle on a single task:
//! - root missing: arm the retry timer and check again when it fires
//! - root present: subscribe the whole tree and wait for an event
//! - first event: release every subscription and arm the debounce timer
//! - debounce fired: run one commit pass, then start over
//!
//! With settling on, a debounce expiry that finds fresh mtimes opens another
//! window instead of committing, at most `max_deferrals` times in a row.
//!
//! At most one of the two timers is armed at any time, and a new debounce
//! window cannot open before the previous commit pass has returned.

use crate::error::{Result, WatchError};
use crate::provider::WatchProvider;
use crate::registry::WatchRegistry;
use crate::timer::{OneShotTimer, TimerKind};
use crate::WatchEvent;
use std::future::{self, Future};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

/// File mtimes come from a coarse kernel clock and can trail
/// `SystemTime::now()` by a tick, so windows open this far in the past.
const MTIME_SLACK: Duration = Duration::from_millis(50);

fn window_start() -> SystemTime {
    let now = SystemTime::now();
    now.checked_sub(MTIME_SLACK).unwrap_or(now)
}

/// Work performed once the tree has been quiet for a full window.
///
/// Runs synchronously on the controller task; event delivery stalls until it
/// returns. Failures are the committer's to log.
pub trait Committer {
    fn commit(&mut self, root: &Path);
}

impl<F: FnMut(&Path)> Committer for F {
    fn commit(&mut self, root: &Path) {
        self(root)
    }
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Length of both the debounce window and the retry interval
    pub timeout: Duration,

    /// Defer the commit while files are still being modified
    pub settle: bool,

    /// Extra windows a commit may be deferred before it runs regardless
    pub max_deferrals: u32,
}

pub const DEFAULT_MAX_DEFERRALS: u32 = 10;

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            settle: true,
            max_deferrals: DEFAULT_MAX_DEFERRALS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Root directory missing, retry timer armed
    Retrying,
    /// Tree subscribed, waiting for the first event
    Watching,
    /// Subscriptions released, debounce timer armed
    Debouncing,
}

pub struct Controller<P: WatchProvider, C: Committer> {
    root: PathBuf,
    options: ControllerOptions,
    registry: WatchRegistry<P>,
    committer: C,
    events: UnboundedReceiver<WatchEvent>,
    debounce: OneShotTimer,
    retry: OneShotTimer,
    state: ControllerState,
    /// Wall-clock start of the current debounce window
    window_started: Option<SystemTime>,
    /// Windows opened by the settle check since the triggering event
    deferrals: u32,
    /// Set while a missing root has already been reported
    root_missing: bool,
    /// Whether the root directory existed at the last evaluation
    root_present: bool,
}

impl<P: WatchProvider, C: Committer> Controller<P, C> {
    pub fn new(root: impl Into<PathBuf>, provider: P, committer: C, options: ControllerOptions) -> Self {
        let (tx, events) = mpsc::unbounded_channel();

        Self {
            root: root.into(),
            options,
            registry: WatchRegistry::new(provider, tx),
            committer,
            events,
            debounce: OneShotTimer::new(TimerKind::Debounce),
            retry: OneShotTimer::new(TimerKind::Retry),
            state: ControllerState::Retrying,
            window_started: None,
            deferrals: 0,
            root_missing: false,
            root_present: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn registry(&self) -> &WatchRegistry<P> {
        &self.registry
    }

    /// Run the cycle forever
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(future::pending::<()>()).await
    }

    /// Run the cycle until `shutdown` resolves, then release the tree.
    ///
    /// Only `WatchError::ResourceExhausted` and internal invariant violations
    /// end the loop early.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);

        self.evaluate_root()?;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.step() => result?,
            }
        }

        info!("Stopped watching {}", self.root.display());
        self.registry.unsubscribe_all();
        Ok(())
    }

    /// Check the root and move to Watching or Retrying accordingly.
    pub fn evaluate_root(&mut self) -> Result<()> {
        self.root_present = self.registry.provider().directory_exists(&self.root);
        if !self.root_present {
            return self.enter_retrying();
        }

        let count = self.registry.subscribe(&self.root)?;
        if count == 0 {
            return self.enter_retrying();
        }

        if self.root_missing {
            info!("Directory {} is available", self.root.display());
            self.root_missing = false;
        }
        debug!(count, "Watching {}", self.root.display());
        self.state = ControllerState::Watching;
        Ok(())
    }

    /// Wait for the next event or timer expiry of the current state and
    /// handle it.
    pub(crate) async fn step(&mut self) -> Result<()> {
        match self.state {
            ControllerState::Retrying => {
                self.retry.expired().await;
                self.on_retry_expired()
            }
            ControllerState::Watching => {
                let event = self.events.recv().await.ok_or(WatchError::ChannelClosed)?;
                self.on_event(event)
            }
            ControllerState::Debouncing => {
                self.debounce.expired().await;
                self.on_debounce_expired()
            }
        }
    }

    fn enter_retrying(&mut self) -> Result<()> {
        if self.root_missing {
            debug!("Directory {} still unavailable", self.root.display());
        } else {
            warn!(
                "Directory {} is not available, retrying every {}s",
                self.root.display(),
                self.options.timeout.as_secs()
            );
            self.root_missing = true;
        }

        self.arm(TimerKind::Retry)?;
        self.state = ControllerState::Retrying;
        Ok(())
    }

    fn on_retry_expired(&mut self) -> Result<()> {
        // Capture whatever changed while the directory was out of sight. A
        // root that exists but could not be watched gets no pass.
        if !self.root_present && self.registry.provider().directory_exists(&self.root) {
            self.committer.commit(&self.root);
        }
        self.evaluate_root()
    }

    fn on_event(&mut self, event: WatchEvent) -> Result<()> {
        if self.registry.is_empty() || event.generation != self.registry.generation() {
            debug!("Ignoring event from released subscription: {}", event.path.display());
            return Ok(());
        }

        info!("File {} - {}, starting timer", event.kind, event.path.display());

        self.registry.unsubscribe_all();
        while self.events.try_recv().is_ok() {}

        self.window_started = Some(window_start());
        self.deferrals = 0;
        self.arm(TimerKind::Debounce)?;
        self.state = ControllerState::Debouncing;
        Ok(())
    }

    fn on_debounce_expired(&mut self) -> Result<()> {
        if self.options.settle {
            if self.deferrals >= self.options.max_deferrals {
                info!(
                    "Changes under {} did not settle after {} extra windows, committing anyway",
                    self.root.display(),
                    self.deferrals
                );
            } else if let Some(since) = self.window_started {
                if self.registry.provider().modified_since(&self.root, since) {
                    debug!("Changes still landing under {}, waiting another window", self.root.display());
                    self.window_started = Some(window_start());
                    self.deferrals += 1;
                    return self.arm(TimerKind::Debounce);
                }
            }
        }

        self.window_started = None;
        self.deferrals = 0;
        self.committer.commit(&self.root);
        self.evaluate_root()
    }

    fn arm(&mut self, kind: TimerKind) -> Result<()> {
        if self.debounce.is_armed() || self.retry.is_armed() {
            return Err(WatchError::TimerArmed { kind });
        }

        match kind {
            TimerKind::Debounce => self.debounce.arm(self.options.timeout),
            TimerKind::Retry => self.retry.arm(self.options.timeout),
        }
    }
}
