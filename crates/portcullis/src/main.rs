//! Portcullis - authenticating OIDC reverse-proxy gateway
//!
//! Main entry point for the Portcullis CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{check, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Portcullis - authenticating OIDC reverse-proxy gateway
#[derive(Parser)]
#[command(name = "portcullis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (overrides default discovery)
    #[arg(short, long, global = true, env = "PORTCULLIS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway
    Start(start::StartArgs),

    /// Validate the configuration and show the route table
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = portcullis_config::load_config(cli.config.as_deref())?;

    // Held until exit so buffered file logs are flushed.
    let _guard = logging::init(&loaded.config.logging, cli.verbose)?;
    tracing::debug!(source = %loaded.source.display(), "Configuration loaded");

    let ctx = commands::Context {
        config_source: loaded.source,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, loaded.config, &ctx).await,
        Commands::Check(args) => check::run(args, loaded.config, &ctx).await,
    }
}
