//! git2-backed implementation of the version-control boundary

use chrono::{DateTime, Utc};
use git2::{Repository, RepositoryInitOptions, Signature, Time};
use std::path::Path;
use tracing::trace;

use super::{VcsBackend, VcsError};

/// Writes real git history through libgit2. Author identity and branch
/// name come from configuration; commit dates come from the caller.
pub struct GitBackend {
    author_name: String,
    author_email: String,
    branch: String,
}

impl GitBackend {
    pub fn new(
        author_name: impl Into<String>,
        author_email: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
            branch: branch.into(),
        }
    }

    fn signature_at(&self, timestamp: DateTime<Utc>) -> Result<Signature<'static>, git2::Error> {
        // Offset 0: generated histories are stamped in UTC.
        Signature::new(
            &self.author_name,
            &self.author_email,
            &Time::new(timestamp.timestamp(), 0),
        )
    }
}

impl VcsBackend for GitBackend {
    fn default_branch(&self) -> &str {
        &self.branch
    }

    fn init(&self, dir: &Path) -> Result<(), VcsError> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(&self.branch);
        Repository::init_opts(dir, &opts).map_err(VcsError::Init)?;
        trace!(dir = %dir.display(), branch = %self.branch, "initialized repository");
        Ok(())
    }

    fn stage(&self, dir: &Path, paths: &[&str]) -> Result<(), VcsError> {
        let repo = Repository::open(dir).map_err(VcsError::Stage)?;
        let mut index = repo.index().map_err(VcsError::Stage)?;
        for path in paths {
            let rel = Path::new(path);
            if dir.join(rel).exists() {
                index.add_path(rel).map_err(VcsError::Stage)?;
            } else {
                index.remove_path(rel).map_err(VcsError::Stage)?;
            }
        }
        index.write().map_err(VcsError::Stage)?;
        Ok(())
    }

    fn commit(
        &self,
        dir: &Path,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<String, VcsError> {
        let repo = Repository::open(dir).map_err(VcsError::Commit)?;
        let mut index = repo.index().map_err(VcsError::Commit)?;
        let tree_id = index.write_tree().map_err(VcsError::Commit)?;
        let tree = repo.find_tree(tree_id).map_err(VcsError::Commit)?;
        let signature = self.signature_at(timestamp).map_err(VcsError::Commit)?;

        // Unborn HEAD on the first commit means no parent.
        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .map_err(VcsError::Commit)?;
        trace!(dir = %dir.display(), commit = %oid, "created commit");
        Ok(oid.to_string())
    }
}
