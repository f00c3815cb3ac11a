//! Studio CLI
//!
//! Main entry point for the `studio` command-line tool.
//! Indexes a workspace into the local retrieval core and queries it.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AddCommand, ContextCommand, IndexCommand, QueryCommand, StatsCommand};
use studio_core::{
    config::AppConfig,
    logging::{self, LogFormat},
};
use std::path::PathBuf;
use tracing::Instrument;

/// Studio CLI - local retrieval over your codebase and documents
#[derive(Parser, Debug)]
#[command(name = "studio")]
#[command(about = "Local retrieval over your codebase and documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "STUDIO_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "STUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Embedding provider (ollama, trigram)
    #[arg(short, long, global = true, env = "STUDIO_EMBEDDING_PROVIDER")]
    provider: Option<String>,

    /// Embedding model identifier
    #[arg(short, long, global = true, env = "STUDIO_EMBEDDING_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index source files under one or more paths
    Index(IndexCommand),

    /// Add a single document to the store
    Add(AddCommand),

    /// Query indexed content
    Query(QueryCommand),

    /// Print the context block for a query
    Context(ContextCommand),

    /// Show store and cache statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );
    config.validate().context("invalid configuration")?;

    let format = if config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("Studio CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Embedding provider: {}", config.embedding.provider);
    tracing::debug!("Embedding model: {}", config.embedding.model);

    config.ensure_studio_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Add(_) => "add",
        Commands::Query(_) => "query",
        Commands::Context(_) => "context",
        Commands::Stats(_) => "stats",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        let result = match cli.command {
            Commands::Index(cmd) => cmd.execute(&config).await,
            Commands::Add(cmd) => cmd.execute(&config).await,
            Commands::Query(cmd) => cmd.execute(&config).await,
            Commands::Context(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
        };

        match &result {
            Ok(_) => tracing::info!("Command completed successfully"),
            Err(e) => tracing::error!("Command failed: {}", e),
        }
        result
    }
    .instrument(span)
    .await;

    result.with_context(|| format!("studio {} failed", command_name))
}
