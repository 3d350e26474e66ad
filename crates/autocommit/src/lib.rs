//! Git auto-commit pipeline
//!
//! This crate provides:
//! - HEAD state checks (unborn / detached)
//! - Working-tree status classification
//! - The stage → tree → commit pipeline behind every auto-commit

pub mod error;
pub mod head;
pub mod orchestrator;
pub mod status;

// Re-exports
pub use error::{CommitError, Result};
pub use head::HeadState;
pub use orchestrator::{
    check_repository, CommitOptions, CommitOutcome, Orchestrator, TouchedCounting,
    COMMIT_MESSAGE, SIGNATURE_EMAIL, SIGNATURE_NAME,
};
pub use status::{Classification, StatusEntry};
