//! Built-in catalog the planner draws from
//!
//! Language profiles, project categories, name fragments, and complexity
//! tiers live here as static tables, so planning never needs network
//! access. The fallback README composer also lives here because it leans
//! on the same per-language metadata.

use super::types::{Complexity, NameStyle, ProjectConcept};

/// Per-language generation profile
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    /// Catalog key, lowercase ("python")
    pub name: &'static str,
    /// Human-readable form ("Python")
    pub display: &'static str,
    /// Primary source extension without the dot
    pub extension: &'static str,
    /// Manifest or config files a project of this language typically carries
    pub config_files: &'static [&'static str],
    pub install_command: &'static str,
    pub run_command: &'static str,
    /// Technologies plausibly paired with the language
    pub technologies: &'static [&'static str],
}

pub const LANGUAGES: &[LanguageProfile] = &[
    LanguageProfile {
        name: "python",
        display: "Python",
        extension: "py",
        config_files: &["requirements.txt", "setup.py"],
        install_command: "pip install -r requirements.txt",
        run_command: "python main.py",
        technologies: &["click", "requests", "flask", "sqlite", "asyncio"],
    },
    LanguageProfile {
        name: "javascript",
        display: "JavaScript",
        extension: "js",
        config_files: &["package.json"],
        install_command: "npm install",
        run_command: "npm start",
        technologies: &["express", "node", "commander", "axios"],
    },
    LanguageProfile {
        name: "typescript",
        display: "TypeScript",
        extension: "ts",
        config_files: &["package.json", "tsconfig.json"],
        install_command: "npm install",
        run_command: "npm start",
        technologies: &["express", "node", "zod", "vitest"],
    },
    LanguageProfile {
        name: "rust",
        display: "Rust",
        extension: "rs",
        config_files: &["Cargo.toml"],
        install_command: "cargo build --release",
        run_command: "cargo run",
        technologies: &["clap", "serde", "tokio", "reqwest"],
    },
    LanguageProfile {
        name: "go",
        display: "Go",
        extension: "go",
        config_files: &["go.mod"],
        install_command: "go mod download",
        run_command: "go run .",
        technologies: &["cobra", "net/http", "sqlite", "goroutines"],
    },
    LanguageProfile {
        name: "ruby",
        display: "Ruby",
        extension: "rb",
        config_files: &["Gemfile"],
        install_command: "bundle install",
        run_command: "ruby main.rb",
        technologies: &["thor", "sinatra", "rake"],
    },
];

pub const CATEGORIES: &[&str] = &[
    "cli tool",
    "web scraper",
    "api service",
    "data pipeline",
    "automation script",
    "parser",
    "dev tool",
    "monitoring agent",
    "chat bot",
    "file utility",
    "text processor",
    "task manager",
];

/// Generic feature bullets assigned to concepts that have no caller hints
pub const FEATURES: &[&str] = &[
    "configuration via a simple config file",
    "clear command-line interface",
    "structured logging",
    "graceful error handling",
    "incremental processing of large inputs",
    "pluggable output formats",
    "automatic retries on transient failures",
    "local caching of intermediate results",
    "colorized terminal output",
    "basic test coverage",
];

// Name fragment pools, one pair per style.
const DESCRIPTIVE_HEADS: &[&str] = &[
    "log", "task", "config", "data", "file", "queue", "cache", "repo", "event", "metric", "text",
    "backup", "report", "feed",
];
const DESCRIPTIVE_TAILS: &[&str] = &[
    "parser", "runner", "watcher", "sync", "monitor", "kit", "manager", "tracker", "inspector",
    "scanner", "helper", "digest",
];

const QUIRKY_HEADS: &[&str] = &[
    "turbo", "mighty", "sleepy", "cosmic", "funky", "wobbly", "crispy", "sneaky", "fuzzy", "noisy",
];
const QUIRKY_TAILS: &[&str] = &[
    "ferret", "penguin", "waffle", "goblin", "comet", "walrus", "pickle", "badger", "lobster",
    "magpie",
];

const TECHNICAL_HEADS: &[&str] = &[
    "async", "stream", "vector", "proto", "micro", "delta", "flux", "graph", "hash", "batch",
];
const TECHNICAL_TAILS: &[&str] = &[
    "relay", "index", "probe", "forge", "core", "gate", "bridge", "engine", "node", "store",
];

/// Head/tail pools for a naming style. Names are composed as
/// "{head}-{tail}".
pub fn name_fragments(style: NameStyle) -> (&'static [&'static str], &'static [&'static str]) {
    match style {
        NameStyle::Descriptive => (DESCRIPTIVE_HEADS, DESCRIPTIVE_TAILS),
        NameStyle::Quirky => (QUIRKY_HEADS, QUIRKY_TAILS),
        NameStyle::Technical => (TECHNICAL_HEADS, TECHNICAL_TAILS),
    }
}

/// Sizing parameters for one complexity tier
#[derive(Debug, Clone, Copy)]
pub struct ComplexityProfile {
    pub tier: Complexity,
    /// Selection weight out of 100
    pub weight: u32,
    /// Inclusive range of files in the initial commit
    pub initial_files: (usize, usize),
    pub descriptor: &'static str,
}

pub const COMPLEXITY_PROFILES: &[ComplexityProfile] = &[
    ComplexityProfile {
        tier: Complexity::Low,
        weight: 40,
        initial_files: (2, 3),
        descriptor: "small",
    },
    ComplexityProfile {
        tier: Complexity::Medium,
        weight: 45,
        initial_files: (3, 5),
        descriptor: "mid-sized",
    },
    ComplexityProfile {
        tier: Complexity::High,
        weight: 15,
        initial_files: (4, 5),
        descriptor: "full-featured",
    },
];

pub fn profile_for(tier: Complexity) -> &'static ComplexityProfile {
    // The table covers every tier, so this lookup cannot miss.
    COMPLEXITY_PROFILES
        .iter()
        .find(|p| p.tier == tier)
        .unwrap_or(&COMPLEXITY_PROFILES[0])
}

pub fn language_profile(name: &str) -> Option<&'static LanguageProfile> {
    LANGUAGES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name) || l.display.eq_ignore_ascii_case(name))
}

/// Compose a plausible README for a concept without calling the
/// generation service. Used for the initial commit when the service is
/// exhausted.
pub fn fallback_readme(concept: &ProjectConcept) -> String {
    let (install, run) = match language_profile(&concept.language) {
        Some(profile) => (profile.install_command, profile.run_command),
        None => ("see the documentation", "see the documentation"),
    };

    let mut readme = format!("# {}\n\n{}\n", concept.name, concept.description);

    if !concept.features.is_empty() {
        readme.push_str("\n## Features\n\n");
        for feature in &concept.features {
            readme.push_str(&format!("- {}\n", feature));
        }
    }

    readme.push_str(&format!(
        "\n## Installation\n\n```\n{}\n```\n\n## Usage\n\n```\n{}\n```\n",
        install, run
    ));
    readme
}
