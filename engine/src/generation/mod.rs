//! Generation service boundary
//!
//! The synthesis pipeline talks to an AI code-generation service through
//! the [`GenerationService`] trait. The trait deals in concepts, snapshots,
//! and structured change sets; transport details (HTTP, prompts, response
//! recovery) belong to the concrete providers.

pub mod anthropic;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use crate::persona::types::{FileSnapshot, ProjectConcept};

/// Errors produced while requesting generated changes
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Response parsing failed: {0}")]
    Parse(String),
    #[error("Unusable change set: {0}")]
    Unusable(String),
}

/// The flavor of change an incremental step should make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Feature,
    Structure,
    Config,
    Refactor,
    Fix,
    Docs,
    Polish,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Feature => "feature",
            ChangeKind::Structure => "structure",
            ChangeKind::Config => "config",
            ChangeKind::Refactor => "refactor",
            ChangeKind::Fix => "fix",
            ChangeKind::Docs => "docs",
            ChangeKind::Polish => "polish",
        }
    }

    /// Conventional-commit type used when a message has to be composed
    /// locally
    pub fn conventional_prefix(&self) -> &'static str {
        match self {
            ChangeKind::Feature => "feat",
            ChangeKind::Structure => "refactor",
            ChangeKind::Config => "chore",
            ChangeKind::Refactor => "refactor",
            ChangeKind::Fix => "fix",
            ChangeKind::Docs => "docs",
            ChangeKind::Polish => "style",
        }
    }

    /// One-line instruction handed to the service describing what this
    /// step should do
    pub fn guidance(&self) -> &'static str {
        match self {
            ChangeKind::Feature => "Add a new feature or meaningfully extend an existing one",
            ChangeKind::Structure => "Introduce or reorganize project structure (new modules, moved code)",
            ChangeKind::Config => "Add or adjust configuration, manifests, or tooling files",
            ChangeKind::Refactor => "Refactor existing code without changing behavior",
            ChangeKind::Fix => "Fix a plausible bug in the existing code",
            ChangeKind::Docs => "Improve documentation or comments",
            ChangeKind::Polish => "Polish details: naming, formatting, small cleanups",
        }
    }

    /// Draw a kind appropriate to how far along the history is. Early
    /// commits build things out, the middle mixes features with fixes,
    /// and the tail trends toward maintenance.
    pub fn for_progress<R: Rng>(index: usize, total: usize, rng: &mut R) -> Self {
        let progress = index as f64 / total.max(1) as f64;
        let pool: &[ChangeKind] = if progress < 0.3 {
            &[ChangeKind::Feature, ChangeKind::Structure, ChangeKind::Config]
        } else if progress < 0.7 {
            &[
                ChangeKind::Feature,
                ChangeKind::Feature,
                ChangeKind::Refactor,
                ChangeKind::Fix,
            ]
        } else {
            &[
                ChangeKind::Fix,
                ChangeKind::Docs,
                ChangeKind::Refactor,
                ChangeKind::Polish,
            ]
        };
        pool[rng.gen_range(0..pool.len())]
    }
}

/// What kind of commit the service is being asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepIntent {
    /// First commit: lay down the initial project skeleton
    Initial,
    /// Later commit: evolve the existing tree
    Incremental(ChangeKind),
}

/// Everything a provider needs to generate one step
#[derive(Debug)]
pub struct GenerationRequest<'a> {
    pub concept: &'a ProjectConcept,
    /// Current tree state; `None` for the initial commit
    pub snapshot: Option<&'a FileSnapshot>,
    /// Zero-based position of this step in the history
    pub step_index: usize,
    pub step_count: usize,
    pub intent: StepIntent,
}

/// One file-level change returned by the service. `content: None` means
/// the file should be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: Option<String>,
}

impl FileChange {
    pub fn write(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

/// A service response: commit message plus the files it touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedChange {
    pub message: String,
    pub files: Vec<FileChange>,
}

/// Boundary trait for AI code-generation backends
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Provider name for logging and diagnostics
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedChange, GenerationError>;

    /// Cheap readiness probe used by diagnostics; not a full request
    async fn check_health(&self) -> bool {
        true
    }
}

/// Locate a JSON object inside service output that may wrap it in a
/// markdown fence or surrounding prose.
pub fn extract_json_object(content: &str) -> Option<&str> {
    extract_fenced(content).or_else(|| extract_balanced(content))
}

fn extract_fenced(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_fence = &content[fence_start + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let fence_end = body.find("```")?;
    let candidate = body[..fence_end].trim();
    if candidate.starts_with('{') {
        Some(candidate)
    } else {
        None
    }
}

fn extract_balanced(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn extracts_fenced_json_with_language_tag() {
        let content = "Here you go:\n```json\n{\"message\": \"hi\"}\n```\nDone.";
        assert_eq!(extract_json_object(content), Some("{\"message\": \"hi\"}"));
    }

    #[test]
    fn extracts_fenced_json_without_language_tag() {
        let content = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(content), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_bare_object_from_prose() {
        let content = "The result is {\"a\": {\"b\": 2}} as requested.";
        assert_eq!(extract_json_object(content), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let content = "{\"code\": \"if (x) { y(); }\"}";
        assert_eq!(extract_json_object(content), Some(content));
    }

    #[test]
    fn no_json_yields_none() {
        assert_eq!(extract_json_object("no structured data here"), None);
        assert_eq!(extract_json_object("unbalanced { oops"), None);
    }

    #[test]
    fn early_progress_draws_buildout_kinds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let kind = ChangeKind::for_progress(1, 10, &mut rng);
            assert!(matches!(
                kind,
                ChangeKind::Feature | ChangeKind::Structure | ChangeKind::Config
            ));
        }
    }

    #[test]
    fn late_progress_draws_maintenance_kinds() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..50 {
            let kind = ChangeKind::for_progress(9, 10, &mut rng);
            assert!(matches!(
                kind,
                ChangeKind::Fix | ChangeKind::Docs | ChangeKind::Refactor | ChangeKind::Polish
            ));
        }
    }

    #[test]
    fn file_change_constructors() {
        let write = FileChange::write("a.txt", "body");
        assert_eq!(write.content.as_deref(), Some("body"));
        let delete = FileChange::delete("a.txt");
        assert!(delete.content.is_none());
    }
}
