//! Commit pipeline errors, one variant per step

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Cannot open the git repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Cannot check the state of HEAD: {0}")]
    HeadState(#[source] git2::Error),

    #[error("Cannot open the index file: {0}")]
    OpenIndex(#[source] git2::Error),

    #[error("Cannot read working tree status: {0}")]
    Status(#[source] git2::Error),

    #[error("Cannot add {path} to index: {source}")]
    Stage {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Cannot remove {path} from index: {source}")]
    Unstage {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Cannot write index to disk: {0}")]
    WriteIndex(#[source] git2::Error),

    #[error("Cannot write index as a tree: {0}")]
    WriteTree(#[source] git2::Error),

    #[error("Cannot find the index tree object: {0}")]
    FindTree(#[source] git2::Error),

    #[error("Cannot create the signature: {0}")]
    Signature(#[source] git2::Error),

    #[error("Cannot find HEAD id: {0}")]
    ResolveHead(#[source] git2::Error),

    #[error("Cannot find HEAD commit: {0}")]
    FindParent(#[source] git2::Error),

    #[error("Cannot create a commit: {0}")]
    CreateCommit(#[source] git2::Error),
}

pub type Result<T> = std::result::Result<T, CommitError>;
