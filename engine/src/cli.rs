//! CLI interface for fabricate
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving synthesis runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fabricate commit-history synthesizer
///
/// Generates small but plausible project repositories with backdated,
/// irregularly spaced commit histories, and optionally publishes them to
/// a hosting service.
#[derive(Parser, Debug)]
#[command(name = "fabricate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate repositories with backdated commit histories
    Run {
        /// Number of repositories to generate (random 1-50 if omitted)
        #[arg(long, value_name = "N")]
        repos: Option<u32>,

        /// History window in days (random 30-1825 if omitted)
        #[arg(long, value_name = "DAYS")]
        history_days: Option<i64>,

        /// Minimum commits per repository
        #[arg(long, value_name = "N")]
        min_commits: Option<u32>,

        /// Maximum commits per repository
        #[arg(long, value_name = "N")]
        max_commits: Option<u32>,

        /// Restrict languages (comma-separated, e.g. "python,rust")
        #[arg(long, value_delimiter = ',', value_name = "LANGS")]
        languages: Vec<String>,

        /// Technologies to tag every concept with (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "TECHS")]
        technologies: Vec<String>,

        /// Categories to tag every concept with (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "CATS")]
        categories: Vec<String>,

        /// Repository naming style (descriptive, quirky, technical)
        #[arg(long, default_value = "descriptive", value_name = "STYLE")]
        name_style: String,

        /// Keep everything local; skip remote creation and pushing
        #[arg(long)]
        local_only: bool,

        /// Remove local copies once their push succeeds
        #[arg(long)]
        cleanup: bool,

        /// Plan and schedule only; generate nothing, write nothing
        #[arg(long)]
        dry_run: bool,

        /// Visibility of created repositories (public, private)
        #[arg(long, value_name = "VIS")]
        visibility: Option<String>,
    },

    /// List repositories on the hosting account
    List {
        /// Only show repositories whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Delete hosted repositories matching a prefix
    Cleanup {
        /// Name prefix selecting what to delete
        #[arg(long)]
        prefix: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Run configuration and connectivity diagnostics
    Doctor,
}
