//! Registry of active directory subscriptions
//!
//! The registry is either empty or covers the whole tree as it was when
//! `subscribe` ran. Individual subscriptions are never released alone.

use crate::error::{Result, WatchError};
use crate::provider::{WatchMode, WatchProvider};
use crate::{EventSink, WatchEvent};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use walkdir::WalkDir;

/// Owns every subscription made for the watched tree
pub struct WatchRegistry<P: WatchProvider> {
    provider: P,
    subscriptions: Vec<P::Handle>,
    tx: UnboundedSender<WatchEvent>,
    generation: u64,
}

impl<P: WatchProvider> WatchRegistry<P> {
    /// Create an empty registry delivering events into `tx`
    pub fn new(provider: P, tx: UnboundedSender<WatchEvent>) -> Self {
        Self {
            provider,
            subscriptions: Vec::new(),
            tx,
            generation: 0,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Generation stamped on events from the current subscriptions.
    /// Advances every time a populated registry is torn down.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Subscribe to the tree rooted at `root`.
    ///
    /// Directories are visited depth-first without following symlinks. A
    /// directory that cannot be watched (permissions, deleted mid-walk) is
    /// skipped along with its subtree. Returns the number of subscriptions.
    pub fn subscribe(&mut self, root: &Path) -> Result<usize> {
        if !self.is_empty() {
            self.unsubscribe_all();
        }

        let sink = EventSink::new(self.tx.clone(), self.generation);

        if self.provider.mode() == WatchMode::Recursive {
            self.add(root, WatchMode::Recursive, sink)?;
            return Ok(self.len());
        }

        let mut walker = WalkDir::new(root).follow_links(false).into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            if !self.add(entry.path(), WatchMode::PerDirectory, sink.clone())? {
                walker.skip_current_dir();
            }
        }

        Ok(self.len())
    }

    /// Stop and release every subscription. No-op on an empty registry.
    pub fn unsubscribe_all(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }

        let count = self.subscriptions.len();
        for handle in self.subscriptions.drain(..) {
            self.provider.unsubscribe(handle);
        }
        self.generation += 1;

        debug!(count, generation = self.generation, "Released watch subscriptions");
    }

    /// Returns `Ok(false)` when the provider refused the directory.
    fn add(&mut self, path: &Path, mode: WatchMode, sink: EventSink) -> Result<bool> {
        // Handles are owned values, so reallocation never moves anything a
        // live callback refers to.
        self.subscriptions
            .try_reserve(1)
            .map_err(|_| WatchError::ResourceExhausted)?;

        match self.provider.subscribe(path, mode, sink) {
            Ok(handle) => {
                self.subscriptions.push(handle);
                Ok(true)
            }
            Err(e) => {
                debug!("{}", e);
                Ok(false)
            }
        }
    }
}

impl<P: WatchProvider> Drop for WatchRegistry<P> {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
