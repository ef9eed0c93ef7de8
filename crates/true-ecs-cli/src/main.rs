//! True-ECS CLI
//!
//! Converts pixel-coordinate tables to sky coordinates for every target in
//! a configuration file, plate-solving images through astrometry.net when
//! no WCS solution is on disk yet.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// True-ECS - pixel positions to equatorial coordinates
#[derive(Parser)]
#[command(name = "true-ecs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every configured target (default)
    Run,

    /// Validate configuration and list matched directories without running
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&cli.config)?,
        Commands::Validate => commands::validate::run(&cli.config)?,
    }

    Ok(())
}
