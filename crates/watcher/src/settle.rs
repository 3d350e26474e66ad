//! Settle scan
//!
//! The registry is torn down on the first event of a debounce window, so
//! writes made during the window are never seen as events. Before committing,
//! the controller scans mtimes to tell whether the tree has actually gone
//! quiet.

use ignore::WalkBuilder;
use std::path::Path;
use std::time::SystemTime;

/// Repository metadata directory, rewritten by every commit
const GIT_DIR: &str = ".git";

/// Whether any file or directory under `root` was modified after `since`.
///
/// Directories count too: deleting or renaming an entry only touches the
/// parent directory's mtime. Paths the repository ignores are never
/// committed, so they are not walked. An mtime ahead of the clock (clock
/// skew, unpacked archives) reads as settled, otherwise it would look like a
/// fresh write on every scan. Entries that cannot be read are skipped.
pub fn changed_since(root: &Path, since: SystemTime) -> bool {
    let now = SystemTime::now();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|e| e.depth() == 0 || e.file_name() != GIT_DIR);

    builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.metadata().ok())
        .filter_map(|metadata| metadata.modified().ok())
        .any(|mtime| mtime > since && mtime <= now)
}
