//! Version-control boundary
//!
//! The materializer drives a [`VcsBackend`] and never touches git
//! directly, so history-writing stays testable with a fake backend.

pub mod git;

use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors produced while writing local repository history
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Repository init failed: {0}")]
    Init(git2::Error),
    #[error("Staging failed: {0}")]
    Stage(git2::Error),
    #[error("Commit failed: {0}")]
    Commit(git2::Error),
    #[error("Plan is inconsistent: {0}")]
    Plan(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal surface the materializer needs from a version-control system
pub trait VcsBackend: Send + Sync {
    /// Branch name new repositories start on
    fn default_branch(&self) -> &str;

    /// Initialize an empty repository at `dir`
    fn init(&self, dir: &Path) -> Result<(), VcsError>;

    /// Bring the index in sync with the working tree for exactly these
    /// paths. Paths missing from the working tree are staged as removals.
    fn stage(&self, dir: &Path, paths: &[&str]) -> Result<(), VcsError>;

    /// Commit the staged index with author and committer dates both set
    /// to `timestamp`. Returns the new commit id as hex.
    fn commit(
        &self,
        dir: &Path,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<String, VcsError>;
}
