//! Configuration management
//!
//! Loading, validation, and defaults for the fabricate configuration.
//! Configuration is stored in TOML format at ~/.fabricate/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path, log level, parallelism
//! - **author**: Commit identity and default branch
//! - **generation**: Code-generation service settings
//! - **remote**: Hosting service settings
//! - **run**: Default run parameters
//!
//! Credentials never live in the file. The `generation` and `remote`
//! sections name the environment variables keys are read from.
//!
//! # Path Expansion
//!
//! The configuration system automatically expands ~ to the user's home
//! directory and creates the workspace directory if it doesn't exist.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

const CONFIG_DIR: &str = ".fabricate";
const CONFIG_FILE: &str = "config.toml";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const VALID_VISIBILITIES: &[&str] = &["public", "private"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Commit identity settings
    #[serde(default)]
    pub author: AuthorConfig,

    /// Code-generation service settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Hosting service settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Default run parameters
    #[serde(default)]
    pub run: RunConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory repositories are materialized into (supports ~ expansion)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How many repositories to process concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

/// Commit identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorConfig {
    /// Name recorded as author and committer
    #[serde(default = "default_author_name")]
    pub name: String,

    /// Email recorded as author and committer
    #[serde(default = "default_author_email")]
    pub email: String,

    /// Branch new repositories start on
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

/// Code-generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL for the messages API
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Token budget for initial-commit requests
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries per commit step before composing a substitute
    #[serde(default = "default_max_step_retries")]
    pub max_step_retries: u32,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Hosting service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL for the hosting REST API
    #[serde(default = "default_remote_base_url")]
    pub base_url: String,

    /// Environment variable holding the hosting token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Visibility for created repositories (public, private)
    #[serde(default = "default_visibility")]
    pub default_visibility: String,
}

/// Default run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Smallest commit history a repository may get
    #[serde(default = "default_min_commits")]
    pub min_commits: u32,

    /// Largest commit history a repository may get
    #[serde(default = "default_max_commits")]
    pub max_commits: u32,
}

fn default_workspace() -> PathBuf {
    PathBuf::from("~/.fabricate/workspace")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_parallelism() -> usize {
    2
}

fn default_author_name() -> String {
    "Fabricate".to_string()
}

fn default_author_email() -> String {
    "fabricate@localhost".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_generation_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    8_000
}

fn default_max_step_retries() -> u32 {
    2
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_remote_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_min_commits() -> u32 {
    5
}

fn default_max_commits() -> u32 {
    37
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            log_level: default_log_level(),
            parallelism: default_parallelism(),
        }
    }
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: default_author_name(),
            email: default_author_email(),
            default_branch: default_branch(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_step_retries: default_max_step_retries(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_base_url(),
            token_env: default_token_env(),
            default_visibility: default_visibility(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_commits: default_min_commits(),
            max_commits: default_max_commits(),
        }
    }
}

impl Config {
    /// Get the configuration directory path (~/.fabricate)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
    }

    /// Get the configuration file path (~/.fabricate/config.toml)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    /// Load configuration from the default location, writing a default
    /// file first if this is the first run
    pub fn load_or_create() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Self::create_default(&path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate_and_process()?;
        Ok(config)
    }

    fn create_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ConfigError(format!("failed to serialize default config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError(format!("failed to create config dir: {}", e)))?;
        }
        fs::write(path, content)
            .map_err(|e| ConfigError(format!("failed to write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "wrote default configuration");
        config.validate_and_process()?;
        Ok(config)
    }

    /// Validate invariants, expand the workspace path, and create the
    /// workspace directory. Called on every load.
    pub fn validate_and_process(&mut self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(ConfigError(format!(
                "invalid log level '{}', expected one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.core.parallelism < 1 {
            return Err(ConfigError("parallelism must be at least 1".to_string()));
        }
        if self.author.name.trim().is_empty() {
            return Err(ConfigError("author name must not be empty".to_string()));
        }
        if !self.author.email.contains('@') {
            return Err(ConfigError(format!(
                "author email '{}' does not look like an email address",
                self.author.email
            )));
        }
        if self.author.default_branch.trim().is_empty() {
            return Err(ConfigError("default branch must not be empty".to_string()));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError("max_tokens must be positive".to_string()));
        }
        if !VALID_VISIBILITIES.contains(&self.remote.default_visibility.as_str()) {
            return Err(ConfigError(format!(
                "invalid visibility '{}', expected one of: {}",
                self.remote.default_visibility,
                VALID_VISIBILITIES.join(", ")
            )));
        }
        if self.run.min_commits < 1 {
            return Err(ConfigError("min_commits must be at least 1".to_string()));
        }
        if self.run.min_commits > self.run.max_commits {
            return Err(ConfigError(format!(
                "min_commits ({}) exceeds max_commits ({})",
                self.run.min_commits, self.run.max_commits
            )));
        }

        self.core.workspace = expand_tilde(&self.core.workspace);
        fs::create_dir_all(&self.core.workspace).map_err(|e| {
            ConfigError(format!(
                "failed to create workspace {}: {}",
                self.core.workspace.display(),
                e
            ))
        })?;
        Ok(())
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
