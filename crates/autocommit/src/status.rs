//! Working-tree status enumeration

use git2::{Repository, Status, StatusOptions};
use tracing::warn;

/// How a working-tree path differs from the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Modified,
    TypeChanged,
    Renamed,
    Deleted,
    /// Differs only in the index, or is conflicted
    Other,
}

/// What an attempt does to the index for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    Stage,
    Remove,
    Skip,
}

impl Classification {
    pub fn from_status(status: Status) -> Self {
        if status.contains(Status::WT_NEW) {
            Classification::New
        } else if status.contains(Status::WT_MODIFIED) {
            Classification::Modified
        } else if status.contains(Status::WT_TYPECHANGE) {
            Classification::TypeChanged
        } else if status.contains(Status::WT_RENAMED) {
            Classification::Renamed
        } else if status.contains(Status::WT_DELETED) {
            Classification::Deleted
        } else {
            Classification::Other
        }
    }

    pub fn action(self) -> IndexAction {
        match self {
            Classification::New
            | Classification::Modified
            | Classification::TypeChanged
            | Classification::Renamed => IndexAction::Stage,
            Classification::Deleted => IndexAction::Remove,
            Classification::Other => IndexAction::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the working directory, `/`-separated
    pub path: String,
    pub classification: Classification,
}

/// List every path that differs from HEAD or the index.
///
/// Untracked directories are expanded to their files; paths ignored by the
/// repository's ignore rules are left out.
pub fn working_tree_status(repo: &Repository) -> Result<Vec<StatusEntry>, git2::Error> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .include_unmodified(false);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut entries = Vec::with_capacity(statuses.len());

    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            warn!(
                "Skipping non UTF-8 path {}",
                String::from_utf8_lossy(entry.path_bytes())
            );
            continue;
        };

        entries.push(StatusEntry {
            path: path.to_string(),
            classification: Classification::from_status(entry.status()),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classification_precedence() {
        assert_eq!(Classification::from_status(Status::WT_NEW), Classification::New);
        assert_eq!(
            Classification::from_status(Status::WT_MODIFIED | Status::INDEX_MODIFIED),
            Classification::Modified
        );
        assert_eq!(
            Classification::from_status(Status::WT_TYPECHANGE),
            Classification::TypeChanged
        );
        assert_eq!(Classification::from_status(Status::WT_DELETED), Classification::Deleted);
        assert_eq!(Classification::from_status(Status::INDEX_NEW), Classification::Other);
        assert_eq!(Classification::from_status(Status::CONFLICTED), Classification::Other);
    }

    #[test]
    fn test_actions() {
        assert_eq!(Classification::Renamed.action(), IndexAction::Stage);
        assert_eq!(Classification::Deleted.action(), IndexAction::Remove);
        assert_eq!(Classification::Other.action(), IndexAction::Skip);
    }

    #[test]
    fn test_status_skips_ignored_and_recurses() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let root = temp_dir.path();

        fs::write(root.join(".gitignore"), "*.log\n").unwrap();
        fs::write(root.join("debug.log"), b"noise").unwrap();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("src/nested/lib.rs"), b"pub fn f() {}").unwrap();

        let mut paths: Vec<_> = working_tree_status(&repo)
            .unwrap()
            .into_iter()
            .map(|e| {
                assert_eq!(e.classification, Classification::New);
                e.path
            })
            .collect();
        paths.sort();

        assert_eq!(paths, vec![".gitignore", "src/nested/lib.rs"]);
    }
}
