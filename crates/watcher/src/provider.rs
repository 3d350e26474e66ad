//! Watch provider capability and its notify-backed implementation

use crate::error::{Result, WatchError};
use crate::{platform, settle, EventKind, EventSink};
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// How a tree is covered by subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// One subscription per directory, each seeing only its direct children
    PerDirectory,
    /// A single subscription covering the whole tree
    Recursive,
}

impl From<WatchMode> for RecursiveMode {
    fn from(mode: WatchMode) -> Self {
        match mode {
            WatchMode::PerDirectory => RecursiveMode::NonRecursive,
            WatchMode::Recursive => RecursiveMode::Recursive,
        }
    }
}

/// Filesystem operations the controller and registry need.
///
/// Handles are owned by the `WatchRegistry` and only ever given back through
/// `unsubscribe`.
pub trait WatchProvider {
    type Handle;

    /// Strategy used by the registry when covering a tree
    fn mode(&self) -> WatchMode;

    fn directory_exists(&self, path: &Path) -> bool;

    /// Start delivering change events under `path` to `sink`.
    fn subscribe(&mut self, path: &Path, mode: WatchMode, sink: EventSink) -> Result<Self::Handle>;

    /// Stop and release a subscription. Never fails; a directory that vanished
    /// has already lost its native watch.
    fn unsubscribe(&mut self, handle: Self::Handle);

    /// Whether anything under `root` was modified after `since`.
    fn modified_since(&self, root: &Path, since: SystemTime) -> bool {
        settle::changed_since(root, since)
    }
}

/// `WatchProvider` backed by the platform's recommended notify watcher.
///
/// All subscriptions share one native watcher. Its callback runs on notify's
/// backend thread and only forwards events into the current sink.
///
/// Events carry the generation of the sink current at delivery time, not of
/// the subscription that saw them. `unwatch` is synchronous with the backend
/// loop and the sink is cleared once the last directory is released, so
/// anything the backend reads between a teardown and the next `subscribe`
/// is dropped. Only an event the backend read for a released watch and then
/// held past the whole debounce window would be stamped with the new
/// generation.
pub struct NotifyProvider {
    watcher: RecommendedWatcher,
    sink: Arc<Mutex<Option<EventSink>>>,
    watched: usize,
    mode: WatchMode,
}

impl NotifyProvider {
    /// Create a provider using the platform default strategy
    pub fn new() -> Result<Self> {
        Self::with_mode(platform::default_mode())
    }

    pub fn with_mode(mode: WatchMode) -> Result<Self> {
        let sink: Arc<Mutex<Option<EventSink>>> = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&sink);

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let Some(kind) = map_event_kind(&event.kind) else {
                        return;
                    };
                    if let Some(sink) = shared.lock().as_ref() {
                        let path = event.paths.into_iter().next().unwrap_or_default();
                        sink.send(path, kind);
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            }
        })?;

        Ok(Self {
            watcher,
            sink,
            watched: 0,
            mode,
        })
    }
}

impl WatchProvider for NotifyProvider {
    type Handle = PathBuf;

    fn mode(&self) -> WatchMode {
        self.mode
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn subscribe(&mut self, path: &Path, mode: WatchMode, sink: EventSink) -> Result<PathBuf> {
        *self.sink.lock() = Some(sink);

        if let Err(source) = self.watcher.watch(path, mode.into()) {
            if self.watched == 0 {
                *self.sink.lock() = None;
            }
            return Err(WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            });
        }

        self.watched += 1;
        Ok(path.to_path_buf())
    }

    fn unsubscribe(&mut self, handle: PathBuf) {
        if let Err(e) = self.watcher.unwatch(&handle) {
            debug!("Unwatch {} failed: {}", handle.display(), e);
        }

        self.watched = self.watched.saturating_sub(1);
        if self.watched == 0 {
            *self.sink.lock() = None;
        }
    }
}

/// Maps a `notify::EventKind` to our `EventKind`, returning `None` for reads.
fn map_event_kind(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(EventKind::Modify),
        notify::EventKind::Access(_) => None,
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Rename),
        notify::EventKind::Modify(_) => Some(EventKind::Modify),
        notify::EventKind::Remove(_) => Some(EventKind::Delete),
        notify::EventKind::Any | notify::EventKind::Other => Some(EventKind::Other),
    }
}
