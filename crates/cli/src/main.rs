//! kbchat CLI
//!
//! Main entry point for the kbchat command-line tool: build a local
//! knowledge index, then ask questions answered only from it.

mod commands;
mod runtime;
#[cfg(test)]
mod testing;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CleanCommand, IngestCommand, StatsCommand};
use kbchat_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;
use tracing::Instrument;

/// kbchat - answer questions from your own documents
#[derive(Parser, Debug)]
#[command(name = "kbchat")]
#[command(about = "Answer questions from a local knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "KBCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "KBCHAT_CONFIG")]
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

    /// Generator provider (groq, ollama)
    #[arg(short, long, global = true, env = "KBCHAT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "KBCHAT_MODEL")]
    model: Option<String>,

    /// Knowledge index name
    #[arg(short, long, global = true, env = "KBCHAT_INDEX")]
    index: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or extend the knowledge index
    Ingest(IngestCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Ask questions interactively
    Chat(ChatCommand),

    /// Show knowledge index statistics
    Stats(StatsCommand),

    /// Delete all content of the knowledge index
    Clean(CleanCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Ingest(_) => "ingest",
            Self::Ask(_) => "ask",
            Self::Chat(_) => "chat",
            Self::Stats(_) => "stats",
            Self::Clean(_) => "clean",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())
        .context("Failed to load configuration")?
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.index,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("kbchat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {}", config.index_name);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_kbchat_dir()?;

    let span = tracing::info_span!("command", name = cli.command.name());

    let result = dispatch(cli.command, &config).instrument(span).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}

async fn dispatch(command: Commands, config: &AppConfig) -> AppResult<()> {
    match command {
        Commands::Ingest(cmd) => cmd.execute(config).await,
        Commands::Ask(cmd) => {
            let workflow = runtime::build_workflow(config)?;
            cmd.execute(config, &workflow).await
        }
        Commands::Chat(cmd) => {
            let workflow = runtime::build_workflow(config)?;
            cmd.execute(&workflow).await
        }
        Commands::Stats(cmd) => cmd.execute(config).await,
        Commands::Clean(cmd) => cmd.execute(config).await,
    }
}
