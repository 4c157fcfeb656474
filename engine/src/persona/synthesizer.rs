//! Incremental code synthesis
//!
//! Pull-based: each call to [`StepSynthesizer::next_step`] asks the
//! generation service for one more commit on top of the running snapshot.
//! Responses are normalized before use, bad responses are retried a fixed
//! number of times, and an exhausted step is substituted with a locally
//! composed change so one flaky step never sinks the repository.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::catalog;
use super::types::{CommitStep, EditSet, FileEdit, FileSnapshot, ProjectConcept};
use crate::generation::{
    ChangeKind, GeneratedChange, GenerationError, GenerationRequest, GenerationService, StepIntent,
};

/// Default number of retries after a failed step attempt
pub const DEFAULT_MAX_STEP_RETRIES: u32 = 2;

pub struct StepSynthesizer {
    service: Arc<dyn GenerationService>,
    concept: ProjectConcept,
    snapshot: FileSnapshot,
    next_index: usize,
    step_count: usize,
    max_step_retries: u32,
    degraded_steps: usize,
    rng: StdRng,
}

impl StepSynthesizer {
    pub fn new(
        service: Arc<dyn GenerationService>,
        concept: ProjectConcept,
        max_step_retries: u32,
    ) -> Self {
        let step_count = concept.commit_count as usize;
        Self {
            service,
            concept,
            snapshot: FileSnapshot::new(),
            next_index: 0,
            step_count,
            max_step_retries,
            degraded_steps: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Tree state after the most recently produced step
    pub fn snapshot(&self) -> &FileSnapshot {
        &self.snapshot
    }

    /// How many steps fell back to a locally composed substitute
    pub fn degraded_steps(&self) -> usize {
        self.degraded_steps
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Produce the next commit step, or `None` once the history is
    /// complete. Never fails: service errors are retried and finally
    /// substituted.
    pub async fn next_step(&mut self) -> Option<CommitStep> {
        if self.next_index >= self.step_count {
            return None;
        }
        let index = self.next_index;
        let intent = if index == 0 {
            StepIntent::Initial
        } else {
            StepIntent::Incremental(ChangeKind::for_progress(
                index,
                self.step_count,
                &mut self.rng,
            ))
        };

        let mut attempts = 0u32;
        let (edits, message, substituted) = loop {
            match self.request_step(index, intent).await {
                Ok((edits, message)) => break (edits, message, false),
                Err(err) => {
                    attempts += 1;
                    if attempts > self.max_step_retries {
                        warn!(
                            repo = %self.concept.name,
                            step = index,
                            error = %err,
                            "generation exhausted, composing substitute step"
                        );
                        break self.substitute(index, intent);
                    }
                    debug!(
                        repo = %self.concept.name,
                        step = index,
                        attempt = attempts,
                        error = %err,
                        "step generation failed, retrying"
                    );
                }
            }
        };

        self.snapshot.apply(&edits);
        if substituted {
            self.degraded_steps += 1;
        }
        self.next_index += 1;
        Some(CommitStep {
            index,
            edits,
            message,
            substituted,
        })
    }

    async fn request_step(
        &self,
        index: usize,
        intent: StepIntent,
    ) -> Result<(EditSet, String), GenerationError> {
        let request = GenerationRequest {
            concept: &self.concept,
            snapshot: if index == 0 { None } else { Some(&self.snapshot) },
            step_index: index,
            step_count: self.step_count,
            intent,
        };
        let change = self.service.generate(request).await?;
        self.normalize(index, intent, change)
    }

    /// Turn a raw service response into a usable edit set, or reject it.
    ///
    /// Duplicate paths collapse to the last occurrence, deletions of
    /// absent files drop out, and unsafe paths are discarded. What
    /// remains must actually change the tree and must not empty it.
    fn normalize(
        &self,
        index: usize,
        intent: StepIntent,
        change: GeneratedChange,
    ) -> Result<(EditSet, String), GenerationError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut edits: Vec<FileEdit> = Vec::new();

        for file in change.files.into_iter().rev() {
            let path = clean_path(&file.path);
            let Some(path) = path else {
                warn!(raw = %file.path, "dropping change with unsafe or empty path");
                continue;
            };
            if !seen.insert(path.clone()) {
                continue;
            }
            match file.content {
                Some(content) => edits.push(FileEdit::write(path, content)),
                None => {
                    if index == 0 {
                        // The initial commit starts from nothing; a
                        // deletion can only be noise.
                        continue;
                    }
                    if !self.snapshot.contains(&path) {
                        debug!(path = %path, "dropping deletion of absent file");
                        continue;
                    }
                    edits.push(FileEdit::delete(path));
                }
            }
        }
        edits.reverse();
        let edits = EditSet { edits };

        if edits.is_empty() {
            return Err(GenerationError::Unusable(
                "change set touched no files".into(),
            ));
        }
        if index > 0 {
            let mut preview = self.snapshot.clone();
            preview.apply(&edits);
            if preview.is_empty() {
                return Err(GenerationError::Unusable(
                    "change set would leave the repository empty".into(),
                ));
            }
        }

        let message = change.message.trim().to_string();
        let message = if message.is_empty() {
            default_message(&self.concept, intent)
        } else {
            message
        };
        Ok((edits, message))
    }

    /// Compose a guaranteed-valid step locally. The initial step becomes
    /// a README; later steps append a maintenance note to it (creating it
    /// if a generated history somehow lacks one).
    fn substitute(&self, index: usize, intent: StepIntent) -> (EditSet, String, bool) {
        let mut edits = EditSet::default();
        let message;
        if index == 0 {
            edits.push(FileEdit::write(
                "README.md",
                catalog::fallback_readme(&self.concept),
            ));
            message = String::from("Initial commit");
        } else {
            let content = match self.snapshot.get("README.md") {
                Some(existing) => format!(
                    "{}\nRevision {} maintenance pass.\n",
                    existing.trim_end(),
                    index
                ),
                None => catalog::fallback_readme(&self.concept),
            };
            edits.push(FileEdit::write("README.md", content));
            message = default_message(&self.concept, intent);
        }
        (edits, message, true)
    }
}

fn default_message(concept: &ProjectConcept, intent: StepIntent) -> String {
    match intent {
        StepIntent::Initial => String::from("Initial commit"),
        StepIntent::Incremental(kind) => {
            format!("{}: update {}", kind.conventional_prefix(), concept.name)
        }
    }
}

/// Normalize a service-supplied path, rejecting anything that could
/// escape the repository root.
fn clean_path(raw: &str) -> Option<String> {
    let mut path = raw.trim();
    path = path.trim_start_matches("./");
    path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    if path.split('/').any(|part| part == ".." || part.is_empty()) {
        return None;
    }
    Some(path.to_string())
}
