//! Change-to-commit pipeline
//!
//! One attempt opens the repository, stages every working-tree change, and
//! records the index as a single commit on HEAD. Any failing step ends the
//! attempt; objects already written are unreferenced and harmless. Every
//! libgit2 handle is a local of the attempt, so all of them are released on
//! every return path.

use crate::error::{CommitError, Result};
use crate::head::HeadState;
use crate::status::{self, IndexAction};
use git2::{Commit, Index, Oid, Repository, Signature};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub const SIGNATURE_NAME: &str = "gwatch";
pub const SIGNATURE_EMAIL: &str = "gwatch@example.com";
pub const COMMIT_MESSAGE: &str = "gwatch auto-commit";

/// Which status entries make an attempt non-empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchedCounting {
    /// Every reported entry counts, including ones that are already staged
    /// and need no index update
    #[default]
    Permissive,
    /// Only entries whose index entry was added or removed count
    IndexMutation,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// File name of the running watcher binary, never committed
    pub self_name: Option<String>,
    pub counting: TouchedCounting,
}

/// Result of a completed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed {
        id: Oid,
        /// 0 for the root commit, otherwise 1
        parents: usize,
        touched: usize,
    },
    /// Nothing to record; no commit written
    NoChanges,
    /// HEAD is detached; the user's checkout is left alone
    DetachedHead,
}

/// Runs commit attempts against a repository root
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    options: CommitOptions,
}

impl Orchestrator {
    pub fn new(options: CommitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CommitOptions {
        &self.options
    }

    /// Run one attempt and log how it ended. Never fails.
    pub fn attempt_commit(&self, repo_root: &Path) {
        debug!("Committing {}", repo_root.display());

        match self.try_commit(repo_root) {
            Ok(CommitOutcome::Committed { id, parents, touched }) => {
                info!(commit = %id, parents, touched, "Successfully created a new commit");
            }
            Ok(CommitOutcome::NoChanges) => debug!("No changes - will not commit"),
            Ok(CommitOutcome::DetachedHead) => info!("HEAD is detached - will not commit"),
            Err(e) => warn!("Git related error, {}", e),
        }
    }

    /// Run one attempt and report the outcome.
    pub fn try_commit(&self, repo_root: &Path) -> Result<CommitOutcome> {
        let repo = Repository::open(repo_root).map_err(CommitError::OpenRepository)?;

        let head = HeadState::query(&repo).map_err(CommitError::HeadState)?;
        if head.detached {
            return Ok(CommitOutcome::DetachedHead);
        }

        let mut index = repo.index().map_err(CommitError::OpenIndex)?;

        let touched = self.stage_changes(&repo, &mut index)?;
        if touched == 0 {
            return Ok(CommitOutcome::NoChanges);
        }

        index.write().map_err(CommitError::WriteIndex)?;
        let tree_id = index.write_tree().map_err(CommitError::WriteTree)?;
        let tree = repo.find_tree(tree_id).map_err(CommitError::FindTree)?;
        let signature =
            Signature::now(SIGNATURE_NAME, SIGNATURE_EMAIL).map_err(CommitError::Signature)?;

        let parent = if head.unborn {
            info!("HEAD is unborn - creating initial commit...");
            None
        } else {
            let parent_id = repo.refname_to_id("HEAD").map_err(CommitError::ResolveHead)?;
            Some(repo.find_commit(parent_id).map_err(CommitError::FindParent)?)
        };
        let parents: Vec<&Commit> = parent.iter().collect();

        let id = repo
            .commit(Some("HEAD"), &signature, &signature, COMMIT_MESSAGE, &tree, &parents)
            .map_err(CommitError::CreateCommit)?;

        Ok(CommitOutcome::Committed {
            id,
            parents: parents.len(),
            touched,
        })
    }

    /// Bring the index in line with the working tree. Returns the number of
    /// touched entries under the configured counting policy.
    fn stage_changes(&self, repo: &Repository, index: &mut Index) -> Result<usize> {
        let entries = status::working_tree_status(repo).map_err(CommitError::Status)?;
        let mut touched = 0;

        for entry in entries {
            if self.options.self_name.as_deref() == Some(entry.path.as_str()) {
                continue;
            }

            let path = Path::new(&entry.path);
            let mutated = match entry.classification.action() {
                IndexAction::Stage => {
                    index.add_path(path).map_err(|source| CommitError::Stage {
                        path: entry.path.clone(),
                        source,
                    })?;
                    true
                }
                IndexAction::Remove => {
                    index.remove_path(path).map_err(|source| CommitError::Unstage {
                        path: entry.path.clone(),
                        source,
                    })?;
                    true
                }
                IndexAction::Skip => false,
            };

            if mutated || self.options.counting == TouchedCounting::Permissive {
                touched += 1;
            }
        }

        Ok(touched)
    }
}

/// Check once that `repo_root` is a repository the pipeline can open.
pub fn check_repository(repo_root: &Path) -> Result<()> {
    Repository::open(repo_root)
        .map(drop)
        .map_err(CommitError::OpenRepository)
}
