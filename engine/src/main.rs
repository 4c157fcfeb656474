// Fabricate Commit-History Synthesizer
// Main entry point for the fabricate binary

use clap::Parser;
use fabricate_engine::cli::{Cli, Command};
use fabricate_engine::config::Config;
use fabricate_engine::handlers::{
    handle_cleanup, handle_doctor, handle_list, handle_run, OutputFormat, RunArgs,
};
use fabricate_engine::telemetry::init_telemetry_with_level;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Initialize telemetry; --log beats the config file, RUST_LOG beats both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::info!("Fabricate Engine v{}", env!("CARGO_PKG_VERSION"));

    // A first Ctrl-C asks the run to wind down; repositories already being
    // generated finish, queued ones are skipped.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight repositories");
            cancel_flag.store(true, Ordering::SeqCst);
        }
    });

    // Handle commands
    match cli.command {
        Command::Run {
            repos,
            history_days,
            min_commits,
            max_commits,
            languages,
            technologies,
            categories,
            name_style,
            local_only,
            cleanup,
            dry_run,
            visibility,
        } => {
            tracing::info!("Starting generation run...");
            let args = RunArgs {
                repos,
                history_days,
                min_commits,
                max_commits,
                languages,
                technologies,
                categories,
                name_style,
                local_only,
                cleanup,
                dry_run,
                visibility,
            };
            handle_run(args, &config, format, cancel).await
        }

        Command::List { prefix } => {
            tracing::info!("Listing hosted repositories...");
            handle_list(prefix, &config, format).await
        }

        Command::Cleanup { prefix, yes } => {
            tracing::info!("Cleaning up hosted repositories...");
            handle_cleanup(prefix, yes, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
