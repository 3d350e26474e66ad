//! HEAD state queries

use git2::{ErrorCode, Repository};

/// What HEAD points at when an attempt starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadState {
    /// No commit exists on the current branch yet
    pub unborn: bool,
    /// HEAD names a commit directly instead of a branch
    pub detached: bool,
}

impl HeadState {
    pub fn query(repo: &Repository) -> Result<Self, git2::Error> {
        let unborn = match repo.head() {
            Ok(_) => false,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => true,
            Err(e) => return Err(e),
        };

        // An unborn HEAD is always symbolic
        let detached = !unborn && repo.head_detached()?;

        Ok(Self { unborn, detached })
    }
}
