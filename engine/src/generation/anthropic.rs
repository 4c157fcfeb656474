//! Anthropic messages API provider
//!
//! Turns step requests into prompts, posts them to the messages endpoint,
//! and recovers structured change sets from the response text. The model
//! is instructed to answer with bare JSON, but responses wrapped in
//! markdown fences or prose are recovered anyway.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    extract_json_object, ChangeKind, FileChange, GeneratedChange, GenerationError,
    GenerationRequest, GenerationService, StepIntent,
};
use crate::config::GenerationConfig;
use crate::persona::catalog;
use crate::secrets::SecretString;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Hard ceiling on files in an initial commit, whatever the tier says
const INITIAL_FILE_CAP: usize = 5;

const CHANGE_SCHEMA: &str = r#"{"commit_message": "<short imperative summary>", "files": [{"path": "<relative path>", "content": "<full file content>"}]}"#;
const INCREMENTAL_SCHEMA: &str = r#"{"commit_message": "<conventional commit message>", "files": [{"path": "...", "content": "<full new content>"} or {"path": "...", "delete": true}]}"#;

pub struct AnthropicGenerator {
    config: GenerationConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(config: GenerationConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn initial_prompts(&self, request: &GenerationRequest<'_>) -> (String, String) {
        let concept = request.concept;
        let profile = catalog::language_profile(&concept.language);
        let display = profile.map(|p| p.display).unwrap_or(concept.language.as_str());
        let (lo, hi) = catalog::profile_for(concept.complexity).initial_files;
        let hi = hi.min(INITIAL_FILE_CAP);

        let system = format!(
            "You are an experienced software developer writing the first commit of a new {} project. \
             You write clean, idiomatic code and respond only with valid JSON. No markdown, no commentary.",
            display
        );

        let mut user = format!(
            "Create the initial commit for this project.\n\n\
             Name: {}\nDescription: {}\nLanguage: {}\n",
            concept.name, concept.description, display
        );
        if !concept.technologies.is_empty() {
            user.push_str(&format!("Technologies: {}\n", concept.technologies.join(", ")));
        }
        if !concept.features.is_empty() {
            user.push_str("Planned features:\n");
            for feature in &concept.features {
                user.push_str(&format!("- {}\n", feature));
            }
        }
        user.push_str(&format!(
            "\nProduce between {} and {} files: a README.md describing the project, one or two \
             starting source files",
            lo, hi
        ));
        if let Some(profile) = profile {
            user.push_str(&format!(
                " (.{}), and typical configuration ({})",
                profile.extension,
                profile.config_files.join(", ")
            ));
        }
        user.push_str(
            ".\nKeep the code small but real; this is a first commit, not a finished product.\n",
        );
        user.push_str(&format!("\nRespond with exactly this JSON shape:\n{}\n", CHANGE_SCHEMA));
        (system, user)
    }

    fn incremental_prompts(
        &self,
        request: &GenerationRequest<'_>,
        kind: ChangeKind,
    ) -> (String, String) {
        let concept = request.concept;
        let system = String::from(
            "You are an experienced software developer evolving an existing project one commit \
             at a time. You respond only with valid JSON. No markdown, no commentary.",
        );

        let mut user = format!(
            "You are working on \"{}\": {} ({}).\n\n\
             This is commit {} of {}. {}.\n\nFiles currently in the repository:\n",
            concept.name,
            concept.description,
            concept.language,
            request.step_index + 1,
            request.step_count,
            kind.guidance()
        );
        if let Some(snapshot) = request.snapshot {
            for path in snapshot.paths() {
                user.push_str(&format!("- {}\n", path));
            }
        }
        user.push_str(
            "\nChange one to three files. To modify a file, return its complete new content. \
             To add a file, do the same with a new path. To delete a file, return \
             {\"path\": \"...\", \"delete\": true}.\n",
        );
        user.push_str(&format!(
            "Write a conventional commit message of type \"{}\".\n\nRespond with exactly this JSON shape:\n{}\n",
            kind.conventional_prefix(),
            INCREMENTAL_SCHEMA
        ));
        (system, user)
    }

    async fn post_messages(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/messages", self.config.base_url);
        let payload = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::AuthenticationFailed(text));
        }
        if status.as_u16() == 429 {
            return Err(GenerationError::RateLimitExceeded);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "status {}: {}",
                status, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        // The messages API returns an array of content blocks; collect
        // every text block.
        let mut text = String::new();
        if let Some(blocks) = body.get("content").and_then(Value::as_array) {
            for block in blocks {
                if block.get("type").and_then(Value::as_str) == Some("text") {
                    if let Some(t) = block.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
            }
        }
        if text.is_empty() {
            return Err(GenerationError::Parse(
                "response contained no text content".into(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerationService for AnthropicGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedChange, GenerationError> {
        let (system, user, max_tokens) = match request.intent {
            StepIntent::Initial => {
                let (system, user) = self.initial_prompts(&request);
                (system, user, self.config.max_tokens)
            }
            StepIntent::Incremental(kind) => {
                let (system, user) = self.incremental_prompts(&request, kind);
                // Incremental steps touch at most three files.
                (system, user, (self.config.max_tokens / 2).max(1_000))
            }
        };

        debug!(
            step = request.step_index,
            of = request.step_count,
            model = %self.config.model,
            "requesting generated change"
        );

        let text = self.post_messages(system, user, max_tokens).await?;
        let raw = extract_json_object(&text).ok_or_else(|| {
            warn!(step = request.step_index, "no JSON object found in response");
            GenerationError::Parse("no JSON object found in response text".into())
        })?;
        let parsed: RawChange = serde_json::from_str(raw)
            .map_err(|e| GenerationError::Parse(format!("malformed change set: {}", e)))?;

        Ok(parsed.into())
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }
}

/// Wire shape of a change set as the model emits it
#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(default)]
    commit_message: String,
    #[serde(default)]
    files: Vec<RawFileChange>,
}

#[derive(Debug, Deserialize)]
struct RawFileChange {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    delete: bool,
}

impl From<RawChange> for GeneratedChange {
    fn from(raw: RawChange) -> Self {
        let files = raw
            .files
            .into_iter()
            .map(|f| {
                if f.delete {
                    FileChange::delete(f.path)
                } else {
                    FileChange {
                        path: f.path,
                        content: Some(f.content.unwrap_or_default()),
                    }
                }
            })
            .collect();
        GeneratedChange {
            message: raw.commit_message,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::{Complexity, ProjectConcept};

    fn concept() -> ProjectConcept {
        ProjectConcept {
            name: "log-parser".into(),
            description: "A small cli tool written in Python.".into(),
            language: "python".into(),
            technologies: vec!["click".into()],
            categories: vec!["cli tool".into()],
            features: vec!["structured logging".into()],
            complexity: Complexity::Low,
            commit_count: 6,
        }
    }

    #[test]
    fn initial_prompt_names_the_file_budget_and_readme() {
        let generator = AnthropicGenerator::new(
            GenerationConfig::default(),
            SecretString::new("key".into()),
        );
        let concept = concept();
        let request = GenerationRequest {
            concept: &concept,
            snapshot: None,
            step_index: 0,
            step_count: 6,
            intent: StepIntent::Initial,
        };
        let (system, user) = generator.initial_prompts(&request);
        assert!(system.contains("Python"));
        assert!(user.contains("README.md"));
        assert!(user.contains("between 2 and 3 files"));
        assert!(user.contains("commit_message"));
    }

    #[test]
    fn incremental_prompt_lists_existing_paths() {
        let generator = AnthropicGenerator::new(
            GenerationConfig::default(),
            SecretString::new("key".into()),
        );
        let concept = concept();
        let mut snapshot = crate::persona::types::FileSnapshot::new();
        snapshot.apply(
            &[crate::persona::types::FileEdit::write("main.py", "pass")]
                .into_iter()
                .collect(),
        );
        let request = GenerationRequest {
            concept: &concept,
            snapshot: Some(&snapshot),
            step_index: 3,
            step_count: 6,
            intent: StepIntent::Incremental(ChangeKind::Fix),
        };
        let (_, user) = generator.incremental_prompts(&request, ChangeKind::Fix);
        assert!(user.contains("- main.py"));
        assert!(user.contains("commit 4 of 6"));
        assert!(user.contains("\"fix\""));
    }

    #[test]
    fn raw_change_maps_delete_flags() {
        let raw: RawChange = serde_json::from_str(
            r#"{"commit_message": "fix: drop legacy shim", "files": [
                {"path": "keep.py", "content": "x = 1"},
                {"path": "legacy.py", "delete": true}
            ]}"#,
        )
        .unwrap();
        let change: GeneratedChange = raw.into();
        assert_eq!(change.message, "fix: drop legacy shim");
        assert_eq!(change.files[0].content.as_deref(), Some("x = 1"));
        assert!(change.files[1].content.is_none());
    }
}
