//! Common utilities for integration tests

pub mod cli;

#[allow(unused_imports)]
pub use cli::{wait_for, CommandResult, GwatchCommand, GwatchProcess};

use git2::Repository;
use std::path::Path;

/// Number of commits reachable from HEAD, 0 while HEAD is unborn
pub fn commit_count(repo_root: &Path) -> usize {
    let Ok(repo) = Repository::open(repo_root) else {
        return 0;
    };
    let Ok(mut walk) = repo.revwalk() else {
        return 0;
    };
    if walk.push_head().is_err() {
        return 0;
    }
    walk.count()
}

/// Parent count of the HEAD commit
pub fn head_parent_count(repo_root: &Path) -> Option<usize> {
    let repo = Repository::open(repo_root).ok()?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    Some(head.parent_count())
}

/// Committer time of HEAD, in seconds since the epoch
pub fn head_commit_time(repo_root: &Path) -> Option<i64> {
    let repo = Repository::open(repo_root).ok()?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    Some(head.time().seconds())
}

/// Content of `name` as recorded in the HEAD tree
pub fn head_file(repo_root: &Path, name: &str) -> Option<Vec<u8>> {
    let repo = Repository::open(repo_root).ok()?;
    let tree = repo.head().ok()?.peel_to_tree().ok()?;
    let entry = tree.get_name(name)?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(blob.content().to_vec())
}
