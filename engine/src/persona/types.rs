//! Core data model for the synthesis pipeline
//!
//! Everything here is plain data: concepts describe what a repository
//! should be, snapshots and edit sets describe file state over time, and
//! outcome types carry results back to the caller. No I/O happens in this
//! module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Complexity tier bounding how large a generated project should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

/// Naming style used when composing repository names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStyle {
    #[default]
    Descriptive,
    Quirky,
    Technical,
}

/// Caller-supplied constraints narrowing what the planner may draw
#[derive(Debug, Clone, Default)]
pub struct LanguageHints {
    /// Restrict language selection to these (catalog names, e.g. "python")
    pub languages: Vec<String>,
    /// Carried verbatim onto every concept when non-empty
    pub technologies: Vec<String>,
    /// Carried verbatim onto every concept when non-empty
    pub categories: Vec<String>,
    pub min_commits: Option<u32>,
    pub max_commits: Option<u32>,
    pub name_style: NameStyle,
}

/// The structured brief driving one repository's generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConcept {
    pub name: String,
    pub description: String,
    /// Catalog language name, e.g. "python" or "rust"
    pub language: String,
    pub technologies: Vec<String>,
    pub categories: Vec<String>,
    /// Short feature bullets fed to the generation service
    pub features: Vec<String>,
    pub complexity: Complexity,
    /// Total number of commits this repository's history will contain
    pub commit_count: u32,
}

/// Ordered commit timestamps, oldest first
pub type Timeline = Vec<DateTime<Utc>>;

/// Full state of the working tree after some step: relative path -> content
///
/// Paths are kept sorted so iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    files: BTreeMap<String, String>,
}

impl FileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    /// Fold an edit set into the snapshot. Writes insert or overwrite,
    /// deletes of absent paths are no-ops.
    pub fn apply(&mut self, edits: &EditSet) {
        for edit in &edits.edits {
            match &edit.kind {
                FileEditKind::Write(content) => {
                    self.files.insert(edit.path.clone(), content.clone());
                }
                FileEditKind::Delete => {
                    self.files.remove(&edit.path);
                }
            }
        }
    }
}

/// What happens to a single file within one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEditKind {
    /// Create the file or replace its content entirely
    Write(String),
    Delete,
}

/// One file-level change inside an edit set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    /// Repository-relative path, forward slashes
    pub path: String,
    pub kind: FileEditKind,
}

impl FileEdit {
    pub fn write(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileEditKind::Write(content.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileEditKind::Delete,
        }
    }
}

/// The changes applied on top of one snapshot to produce the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSet {
    pub edits: Vec<FileEdit>,
}

impl EditSet {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn push(&mut self, edit: FileEdit) {
        self.edits.push(edit);
    }

    /// Paths touched by this edit set, in edit order
    pub fn touched_paths(&self) -> Vec<&str> {
        self.edits.iter().map(|e| e.path.as_str()).collect()
    }
}

impl FromIterator<FileEdit> for EditSet {
    fn from_iter<I: IntoIterator<Item = FileEdit>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

/// One realized commit: index in the history, its edits, and its message
#[derive(Debug, Clone)]
pub struct CommitStep {
    pub index: usize,
    pub edits: EditSet,
    pub message: String,
    /// True when the generation service was exhausted and a locally
    /// composed fallback was used instead
    pub substituted: bool,
}

/// The complete unit of work for one repository
#[derive(Debug, Clone)]
pub struct RepositoryPlan {
    pub concept: ProjectConcept,
    pub timeline: Timeline,
    /// Directory the local repository will be materialized into
    pub workdir: PathBuf,
}

/// Terminal state of one planned repository after a run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoOutcome {
    /// Materialized locally and pushed to the remote host
    Pushed {
        name: String,
        commits: usize,
        degraded_steps: usize,
        remote_url: String,
    },
    /// Materialized locally; either by request or because the push failed
    LocalOnly {
        name: String,
        commits: usize,
        degraded_steps: usize,
        path: PathBuf,
        /// Present when a push was attempted and failed
        reason: Option<String>,
    },
    /// Dry run: planned and scheduled, nothing written
    Planned {
        name: String,
        language: String,
        commits: usize,
        first_commit: DateTime<Utc>,
        last_commit: DateTime<Utc>,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl RepoOutcome {
    pub fn name(&self) -> &str {
        match self {
            RepoOutcome::Pushed { name, .. }
            | RepoOutcome::LocalOnly { name, .. }
            | RepoOutcome::Planned { name, .. }
            | RepoOutcome::Failed { name, .. } => name,
        }
    }
}

/// Aggregate result of one orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub repo_count: usize,
    pub history_days: i64,
    pub outcomes: Vec<RepoOutcome>,
}

impl RunSummary {
    pub fn pushed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepoOutcome::Pushed { .. }))
            .count()
    }

    pub fn local_only(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepoOutcome::LocalOnly { .. }))
            .count()
    }

    pub fn planned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepoOutcome::Planned { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepoOutcome::Failed { .. }))
            .count()
    }
}
