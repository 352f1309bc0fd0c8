use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod design;
mod git;
mod hook;
mod maestro;
mod plan;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atlas")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("atlas.log");

    // Setup env_logger with file output; stdout stays free for hook JSON
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        // Let env_logger parse RUST_LOG
        builder.parse_default_env();
    } else {
        // Use log level from config
        builder.filter_level(log_level.as_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    // Project root and patterns.md are resolved once for every command
    let ctx = commands::Context::new(cli.project_root.as_deref(), cli.verbose, cli.quiet, config)?;

    match cli.command {
        Commands::Init => commands::init::run(&ctx),
        Commands::Uuid { action } => commands::uuid::run(action, &ctx),
        Commands::Search {
            uuid,
            uuid_prefix,
            doc_type,
            status,
            tag,
            issue,
            text,
            format,
        } => {
            let query = design::store::SearchQuery {
                uuid,
                uuid_prefix,
                doc_type,
                status,
                tag,
                issue,
                text,
            };
            commands::search::run(&query, format, &ctx)
        }
        Commands::Validate { file, dir, all, strict } => {
            commands::validate::run(file.as_deref(), dir.as_deref(), all, strict, &ctx)
        }
        Commands::Status { uuid, to, force } => commands::lifecycle::status(&uuid, to, force, &ctx),
        Commands::Archive {
            uuid,
            reason,
            superseded_by,
        } => commands::lifecycle::archive(&uuid, reason.as_deref(), superseded_by.as_deref(), &ctx),
        Commands::Supersede { uuid, by } => commands::lifecycle::supersede(&uuid, &by, &ctx),
        Commands::History { uuid } => commands::lifecycle::history(&uuid, &ctx),
        Commands::Version { action } => commands::version::run(action, &ctx),
        Commands::Export {
            uuid,
            doc_type,
            out,
            sanitize,
            format,
        } => commands::export::run(uuid.as_deref(), doc_type, out.as_deref(), sanitize, format, &ctx),
        Commands::Handoff {
            target,
            issue,
            sanitize,
            dry_run,
            no_commit,
        } => commands::handoff::run(&target, &issue, sanitize, dry_run, !no_commit, &ctx),
        Commands::Transition {
            force,
            dry_run,
            keep_private,
            no_commit,
        } => commands::transition::run(
            design::transition::TransitionOptions {
                force,
                dry_run,
                keep_private,
                commit: !no_commit,
            },
            &ctx,
        ),
        Commands::Message { action } => commands::message::run(action, &ctx),
        // Plan graphs are plain files and need no project
        Commands::Deps { action } => commands::deps::run(action),
        Commands::Plan { action } => commands::plan::run(action, &ctx),
        Commands::Hook { action } => commands::hook::run(action, &ctx),
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Config { action } => commands::config::run(action, &ctx.config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(&config.log_level).context("Failed to setup logging")?;

    info!("Starting atlas with config from: {:?}", cli.config);

    // Run the command
    run(cli, config).context("Command failed")?;

    Ok(())
}
