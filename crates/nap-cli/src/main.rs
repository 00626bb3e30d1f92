//! Network Anomaly Predictor CLI
//!
//! Drives the four pipeline stages: telemetry collection, windowed feature
//! extraction, stratified index splitting, and classifier training.

mod commands;
mod output;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Network Anomaly Predictor CLI
#[derive(Parser)]
#[command(name = "nap")]
#[command(author, version, about = "Network anomaly prediction pipeline", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect raw telemetry from the monitoring API into a long-format CSV
    Collect(commands::collect::CollectArgs),

    /// Extract windowed features from a long-format raw CSV
    Extract(commands::extract::ExtractArgs),

    /// Split a labeled dataset into train/validation/test index sets
    Split(commands::split::SplitArgs),

    /// Train the convolutional classifier and report metrics
    Train(commands::train::TrainArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(fmt::layer())
        .init();

    let settings = settings::Settings::load()?;

    match cli.command {
        Commands::Collect(args) => commands::collect::run(args, &settings).await,
        Commands::Extract(args) => commands::extract::run(args, &settings),
        Commands::Split(args) => commands::split::run(args),
        Commands::Train(args) => commands::train::run(args),
    }
}
