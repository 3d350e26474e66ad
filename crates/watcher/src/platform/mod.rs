//! Platform-specific watch strategy
//!
//! FSEvents (macOS) and ReadDirectoryChangesW (Windows) cover a whole tree
//! with one subscription. inotify and kqueue only see direct children of a
//! watched directory, so the registry subscribes every directory instead.

use crate::provider::WatchMode;

/// Whether the native backend watches a tree with a single subscription.
pub const NATIVE_RECURSIVE: bool = cfg!(any(target_os = "macos", target_os = "windows"));

/// Subscription strategy for the current platform
pub fn default_mode() -> WatchMode {
    if NATIVE_RECURSIVE {
        WatchMode::Recursive
    } else {
        WatchMode::PerDirectory
    }
}
