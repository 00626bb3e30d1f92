//! `nap train` - classifier training and evaluation

use crate::output::{format_metric, print_success};
use anyhow::{Context, Result};
use clap::Args;
use nap_lib::dataset::LabeledDataset;
use nap_lib::model::{Trainer, TrainerConfig};
use nap_lib::storage;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args)]
pub struct TrainArgs {
    /// Labeled dataset (.xlsx or .csv)
    #[arg(long, short)]
    pub dataset: PathBuf,

    /// Index partitions produced by `nap split`
    #[arg(long, short, default_value = "splits.bin")]
    pub splits: PathBuf,

    /// Training epochs
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    /// Mini-batch size
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// RNG seed for weights and batch order
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Skip train-statistics feature standardization
    #[arg(long)]
    pub no_standardize: bool,

    /// Write the final report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct MetricsRow {
    #[tabled(rename = "Partition")]
    partition: &'static str,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "F1")]
    f1: String,
    #[tabled(rename = "AUROC")]
    auroc: String,
}

pub fn run(args: TrainArgs) -> Result<()> {
    let dataset = LabeledDataset::load(&args.dataset)
        .with_context(|| format!("cannot load labeled dataset {:?}", args.dataset))?;
    let splits = storage::load_indices(&args.splits)
        .with_context(|| format!("cannot load split indices {:?}", args.splits))?;

    let trainer = Trainer::new(TrainerConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        seed: args.seed,
        standardize: !args.no_standardize,
        class_weights: None,
    });
    let report = trainer.train(&dataset, &splits)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut rows = Vec::new();
    if let Some(last) = report.epochs.last() {
        rows.push(MetricsRow {
            partition: "val (final epoch)",
            accuracy: format_metric(last.val.accuracy),
            f1: format_metric(last.val.f1),
            auroc: format_metric(last.val.auroc),
        });
    }
    rows.push(MetricsRow {
        partition: "test",
        accuracy: format_metric(report.test.accuracy),
        f1: format_metric(report.test.f1),
        auroc: format_metric(report.test.auroc),
    });
    println!("{}", Table::new(rows).with(Style::rounded()));

    print_success(&format!(
        "trained {} epochs on {} rows",
        report.epochs.len(),
        dataset.len()
    ));
    Ok(())
}
