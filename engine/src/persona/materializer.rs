//! History materialization
//!
//! Pulls steps from a synthesizer and turns them into real commits on
//! disk. Timestamps come from the plan's timeline and are applied
//! verbatim, never reordered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::synthesizer::StepSynthesizer;
use super::types::{EditSet, FileEditKind, RepositoryPlan};
use crate::vcs::{VcsBackend, VcsError};

/// A finished local repository, ready to push or inspect
#[derive(Debug, Clone)]
pub struct LocalRepository {
    pub path: PathBuf,
    pub branch: String,
    pub commits: usize,
    /// Steps that fell back to a locally composed substitute
    pub degraded_steps: usize,
}

/// Materialize one plan into a local git history.
///
/// Each step is applied to the working tree, staged, and committed with
/// the step's scheduled timestamp before the next step is synthesized,
/// so generation failures late in a history never waste earlier commits.
pub async fn materialize(
    plan: &RepositoryPlan,
    synthesizer: &mut StepSynthesizer,
    backend: &dyn VcsBackend,
) -> Result<LocalRepository, VcsError> {
    let expected = plan.concept.commit_count as usize;
    if plan.timeline.len() != expected {
        return Err(VcsError::Plan(format!(
            "timeline has {} entries for {} planned commits",
            plan.timeline.len(),
            expected
        )));
    }

    fs::create_dir_all(&plan.workdir)?;
    backend.init(&plan.workdir)?;
    info!(
        repo = %plan.concept.name,
        dir = %plan.workdir.display(),
        commits = expected,
        "materializing repository"
    );

    let mut commits = 0usize;
    let mut previous: Option<DateTime<Utc>> = None;
    while let Some(step) = synthesizer.next_step().await {
        let stamp = plan
            .timeline
            .get(step.index)
            .copied()
            .ok_or_else(|| VcsError::Plan(format!("no timestamp for step {}", step.index)))?;
        if let Some(previous) = previous {
            if stamp <= previous {
                // The schedule guarantees strict ordering; a violation
                // here is a bug upstream, but the stamp is still applied
                // as given.
                warn!(step = step.index, "timeline is not strictly increasing");
            }
        }

        apply_edits(&plan.workdir, &step.edits)?;
        let touched = step.edits.touched_paths();
        backend.stage(&plan.workdir, &touched)?;
        let id = backend.commit(&plan.workdir, &step.message, stamp)?;
        debug!(
            repo = %plan.concept.name,
            step = step.index,
            commit = %id,
            at = %stamp,
            files = touched.len(),
            substituted = step.substituted,
            "committed step"
        );
        previous = Some(stamp);
        commits += 1;
    }

    Ok(LocalRepository {
        path: plan.workdir.clone(),
        branch: backend.default_branch().to_string(),
        commits,
        degraded_steps: synthesizer.degraded_steps(),
    })
}

/// Write an edit set into the working tree. Deletes of files already
/// absent on disk are no-ops.
fn apply_edits(root: &Path, edits: &EditSet) -> io::Result<()> {
    for edit in &edits.edits {
        let target = root.join(&edit.path);
        match &edit.kind {
            FileEditKind::Write(content) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, content)?;
            }
            FileEditKind::Delete => match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::FileEdit;
    use tempfile::TempDir;

    #[test]
    fn apply_edits_writes_nested_paths_and_deletes() {
        let dir = TempDir::new().unwrap();
        let edits = [
            FileEdit::write("src/lib/util.py", "x = 1\n"),
            FileEdit::write("README.md", "# hi\n"),
        ]
        .into_iter()
        .collect();
        apply_edits(dir.path(), &edits).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/lib/util.py")).unwrap(),
            "x = 1\n"
        );

        let edits = [FileEdit::delete("README.md"), FileEdit::delete("ghost.txt")]
            .into_iter()
            .collect();
        apply_edits(dir.path(), &edits).unwrap();
        assert!(!dir.path().join("README.md").exists());
    }
}
