//! `nap extract` - windowed feature extraction

use crate::output::{format_count, print_success};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::Args;
use nap_lib::features::{FeatureConfig, FeatureExtractor};
use nap_lib::storage;
use std::path::PathBuf;

#[derive(Args)]
pub struct ExtractArgs {
    /// Long-format raw sample CSV
    #[arg(long, short, default_value = "samples.csv")]
    pub input: PathBuf,

    /// Windowed feature table output
    #[arg(long, short, default_value = "features.csv")]
    pub output: PathBuf,

    /// Window width in minutes
    #[arg(long)]
    pub window_minutes: Option<u32>,

    /// IANA timezone for timestamp normalization
    #[arg(long)]
    pub timezone: Option<String>,

    /// Item carrying ICMP latency (jitter source)
    #[arg(long)]
    pub latency_item: Option<String>,
}

pub fn run(args: ExtractArgs, settings: &Settings) -> Result<()> {
    let mut config = settings
        .features
        .clone()
        .unwrap_or_else(FeatureConfig::default);
    if let Some(window_minutes) = args.window_minutes {
        config.window_minutes = window_minutes;
    }
    if let Some(timezone) = args.timezone {
        config.timezone = timezone;
    }
    if let Some(latency_item) = args.latency_item {
        config.latency_item = latency_item;
    }

    let samples = storage::read_samples(&args.input)
        .with_context(|| format!("cannot read raw samples from {:?}", args.input))?;

    let extractor = FeatureExtractor::new(config)?;
    let table = extractor.extract(&samples)?;
    storage::write_feature_table(&args.output, &table)?;

    print_success(&format!(
        "extracted {} windowed rows x {} feature columns from {} raw samples into {}",
        format_count(table.rows.len()),
        table.columns.len(),
        format_count(samples.len()),
        args.output.display()
    ));
    Ok(())
}
