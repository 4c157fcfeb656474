//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Plan and generate a batch of repositories
//! - list: Show repositories on the hosting account
//! - cleanup: Delete hosted repositories by prefix
//! - doctor: Validate configuration and check connectivity

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::Config;
use crate::generation::anthropic::AnthropicGenerator;
use crate::persona::types::{LanguageHints, NameStyle, RepoOutcome, RunSummary};
use crate::persona::{Orchestrator, RunRequest};
use crate::remote::github::GitHubClient;
use crate::remote::{RemoteHost, Visibility};
use crate::secrets::{self, SecretString};
use crate::vcs::git::GitBackend;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Flags accepted by the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub repos: Option<u32>,
    pub history_days: Option<i64>,
    pub min_commits: Option<u32>,
    pub max_commits: Option<u32>,
    pub languages: Vec<String>,
    pub technologies: Vec<String>,
    pub categories: Vec<String>,
    pub name_style: String,
    pub local_only: bool,
    pub cleanup: bool,
    pub dry_run: bool,
    pub visibility: Option<String>,
}

/// Plan and generate a batch of repositories
pub async fn handle_run(
    args: RunArgs,
    config: &Config,
    format: OutputFormat,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let name_style = parse_name_style(&args.name_style)?;
    let visibility = parse_visibility(
        args.visibility
            .as_deref()
            .unwrap_or(&config.remote.default_visibility),
    )?;

    let hints = LanguageHints {
        languages: args.languages,
        technologies: args.technologies,
        categories: args.categories,
        min_commits: Some(args.min_commits.unwrap_or(config.run.min_commits)),
        max_commits: Some(args.max_commits.unwrap_or(config.run.max_commits)),
        name_style,
    };
    let request = RunRequest {
        repos: args.repos,
        history_days: args.history_days,
        hints,
        local_only: args.local_only,
        cleanup_after_push: args.cleanup,
        dry_run: args.dry_run,
        visibility,
    };
    if let Some(days) = request.history_days {
        if days < 1 {
            bail!("--history-days must be at least 1, got {}", days);
        }
    }
    if let Some(repos) = request.repos {
        if repos < 1 {
            bail!("--repos must be at least 1");
        }
    }

    // A dry run never calls the service, so it must not demand a key.
    let api_key = if request.dry_run {
        SecretString::new(String::new())
    } else {
        secrets::from_env(&config.generation.api_key_env).with_context(|| {
            format!(
                "generation API key not found; set the {} environment variable",
                config.generation.api_key_env
            )
        })?
    };
    let service = Arc::new(AnthropicGenerator::new(config.generation.clone(), api_key));

    let backend = Arc::new(GitBackend::new(
        config.author.name.clone(),
        config.author.email.clone(),
        config.author.default_branch.clone(),
    ));

    let remote: Option<Arc<dyn RemoteHost>> = if request.dry_run || request.local_only {
        None
    } else {
        let token = secrets::from_env(&config.remote.token_env).with_context(|| {
            format!(
                "hosting token not found; set the {} environment variable or pass --local-only",
                config.remote.token_env
            )
        })?;
        Some(Arc::new(GitHubClient::new(config.remote.clone(), token)))
    };

    let orchestrator = Orchestrator::new(
        config.core.workspace.clone(),
        config.core.parallelism,
        config.generation.max_step_retries,
        service,
        backend,
        remote,
        cancel,
    );
    let summary = orchestrator.run(request).await;
    print_summary(&summary, format)?;

    if !summary.outcomes.is_empty() && summary.failed() == summary.outcomes.len() {
        bail!("all {} repositories failed", summary.outcomes.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Run Summary ({})", summary.run_id);
            println!();
            println!(
                "  {} repositories over a {}-day window",
                summary.repo_count, summary.history_days
            );
            println!();
            for outcome in &summary.outcomes {
                match outcome {
                    RepoOutcome::Pushed {
                        name,
                        commits,
                        degraded_steps,
                        remote_url,
                    } => {
                        println!(
                            "  ✓ {:<24} {:>3} commits{}  pushed  {}",
                            name,
                            commits,
                            degraded_note(*degraded_steps),
                            remote_url
                        );
                    }
                    RepoOutcome::LocalOnly {
                        name,
                        commits,
                        degraded_steps,
                        path,
                        reason,
                    } => {
                        let note = match reason {
                            Some(reason) => format!("local (push failed: {})", reason),
                            None => "local".to_string(),
                        };
                        println!(
                            "  • {:<24} {:>3} commits{}  {}  {}",
                            name,
                            commits,
                            degraded_note(*degraded_steps),
                            note,
                            path.display()
                        );
                    }
                    RepoOutcome::Planned {
                        name,
                        language,
                        commits,
                        first_commit,
                        last_commit,
                    } => {
                        println!(
                            "  - {:<24} {:>3} commits  {}  {} .. {}",
                            name,
                            commits,
                            language,
                            first_commit.format("%Y-%m-%d"),
                            last_commit.format("%Y-%m-%d")
                        );
                    }
                    RepoOutcome::Failed { name, reason } => {
                        println!("  ✗ {:<24} failed: {}", name, reason);
                    }
                }
            }
            println!();
            println!(
                "  Pushed: {}  Local: {}  Planned: {}  Failed: {}",
                summary.pushed(),
                summary.local_only(),
                summary.planned(),
                summary.failed()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}

fn degraded_note(degraded: usize) -> String {
    if degraded > 0 {
        format!(" ({} substituted)", degraded)
    } else {
        String::new()
    }
}

/// List repositories on the hosting account
pub async fn handle_list(
    prefix: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let client = hosting_client(config)?;
    let repos = client
        .list_repositories(prefix.as_deref())
        .await
        .context("Failed to list repositories")?;

    match format {
        OutputFormat::Text => {
            if repos.is_empty() {
                println!("No repositories found");
                return Ok(());
            }
            println!("Repositories ({}):", repos.len());
            println!();
            for repo in &repos {
                let visibility = if repo.private { "private" } else { "public" };
                println!("  {:<28} {:<8} {}", repo.name, visibility, repo.url);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&repos)?);
        }
    }
    Ok(())
}

/// Delete hosted repositories whose names start with a prefix
pub async fn handle_cleanup(
    prefix: String,
    yes: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    if prefix.trim().is_empty() {
        bail!("--prefix must not be empty; refusing to delete everything");
    }
    let client = hosting_client(config)?;
    let repos = client
        .list_repositories(Some(&prefix))
        .await
        .context("Failed to list repositories")?;

    if repos.is_empty() {
        match format {
            OutputFormat::Text => println!("No repositories match prefix '{}'", prefix),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&json!({"deleted": [], "failed": []}))?
            ),
        }
        return Ok(());
    }

    if let OutputFormat::Text = format {
        println!("Matching repositories:");
        for repo in &repos {
            println!("  {}", repo.full_name);
        }
        println!();
    }

    if !yes {
        let proceed = confirm(&format!(
            "Delete {} repositories matching '{}'? [y/N] ",
            repos.len(),
            prefix
        ))?;
        if !proceed {
            println!("Aborted");
            return Ok(());
        }
    }

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for repo in &repos {
        match client.delete_repository(&repo.full_name).await {
            Ok(()) => deleted.push(repo.full_name.clone()),
            Err(e) => failed.push(json!({"repo": repo.full_name, "error": e.to_string()})),
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Deleted {} of {} repositories", deleted.len(), repos.len());
            for failure in &failed {
                println!("  ✗ {}", failure);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"deleted": deleted, "failed": failed}))?
            );
        }
    }
    Ok(())
}

/// Validate configuration and check connectivity
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Check 1: Configuration validation
    checks.push(("Configuration", "Valid".to_string()));
    // Config is already validated when loaded

    // Check 2: Workspace directory
    if config.core.workspace.is_dir() {
        checks.push(("Workspace directory", "Exists".to_string()));
    } else {
        checks.push(("Workspace directory", "Missing".to_string()));
        issues.push(format!(
            "Workspace directory does not exist: {}",
            config.core.workspace.display()
        ));
    }

    // Check 3: Generation API key
    match secrets::from_env(&config.generation.api_key_env) {
        Some(_) => checks.push(("Generation API key", "Configured".to_string())),
        None => {
            checks.push(("Generation API key", "Not configured".to_string()));
            issues.push(format!(
                "Set {} to enable code generation",
                config.generation.api_key_env
            ));
        }
    }

    // Check 4: Hosting token and connectivity
    match secrets::from_env(&config.remote.token_env) {
        Some(token) => {
            checks.push(("Hosting token", "Configured".to_string()));
            let client = GitHubClient::new(config.remote.clone(), token);
            if client.check_health().await {
                checks.push(("Hosting API", "Reachable".to_string()));
            } else {
                checks.push(("Hosting API", "Unreachable".to_string()));
                issues.push(format!(
                    "Could not authenticate against {}",
                    config.remote.base_url
                ));
            }
        }
        None => {
            checks.push(("Hosting token", "Not configured".to_string()));
            issues.push(format!(
                "Set {} to enable pushing (or use --local-only)",
                config.remote.token_env
            ));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Fabricate Diagnostics");
            println!("=====================");
            println!();
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }
            println!();
            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| json!({"name": name, "status": status})).collect::<Vec<_>>(),
                "issues": issues,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn hosting_client(config: &Config) -> Result<GitHubClient> {
    let token = secrets::from_env(&config.remote.token_env).with_context(|| {
        format!(
            "hosting token not found; set the {} environment variable",
            config.remote.token_env
        )
    })?;
    Ok(GitHubClient::new(config.remote.clone(), token))
}

fn parse_name_style(raw: &str) -> Result<NameStyle> {
    match raw.to_lowercase().as_str() {
        "descriptive" => Ok(NameStyle::Descriptive),
        "quirky" => Ok(NameStyle::Quirky),
        "technical" => Ok(NameStyle::Technical),
        other => bail!(
            "invalid name style '{}', expected descriptive, quirky, or technical",
            other
        ),
    }
}

fn parse_visibility(raw: &str) -> Result<Visibility> {
    match raw.to_lowercase().as_str() {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        other => bail!("invalid visibility '{}', expected public or private", other),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
