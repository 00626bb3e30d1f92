//! `nap split` - stratified train/validation/test index splitting

use crate::output::{format_count, print_success};
use anyhow::{Context, Result};
use clap::Args;
use nap_lib::dataset::{stratified_split, LabeledDataset, SplitConfig};
use nap_lib::storage;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args)]
pub struct SplitArgs {
    /// Labeled dataset (.xlsx or .csv) with timestamp_ventana/host/Y columns
    #[arg(long, short)]
    pub input: PathBuf,

    /// Output file for the index partitions
    #[arg(long, short, default_value = "splits.bin")]
    pub output: PathBuf,

    /// Fraction held out for test
    #[arg(long, default_value_t = 0.30)]
    pub test_fraction: f64,

    /// Fraction of the train branch held out for validation
    #[arg(long, default_value_t = 0.33)]
    pub val_fraction: f64,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Tabled)]
struct PartitionRow {
    #[tabled(rename = "Partition")]
    partition: &'static str,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "Positives")]
    positives: String,
}

pub fn run(args: SplitArgs) -> Result<()> {
    let dataset = LabeledDataset::load(&args.input)
        .with_context(|| format!("cannot load labeled dataset {:?}", args.input))?;

    let config = SplitConfig {
        test_fraction: args.test_fraction,
        val_fraction: args.val_fraction,
        seed: args.seed,
    };
    let splits = stratified_split(&dataset.labels, &config)?;
    storage::save_indices(&args.output, &splits)?;

    let positives = |indices: &[usize]| {
        let count = indices
            .iter()
            .filter(|&&i| dataset.labels[i] == 1)
            .count();
        format_count(count)
    };
    let rows = vec![
        PartitionRow {
            partition: "train",
            rows: format_count(splits.train.len()),
            positives: positives(&splits.train),
        },
        PartitionRow {
            partition: "val",
            rows: format_count(splits.val.len()),
            positives: positives(&splits.val),
        },
        PartitionRow {
            partition: "test",
            rows: format_count(splits.test.len()),
            positives: positives(&splits.test),
        },
    ];
    println!("{}", Table::new(rows).with(Style::rounded()));

    print_success(&format!(
        "split {} rows (seed {}) into {}",
        format_count(dataset.len()),
        args.seed,
        args.output.display()
    ));
    Ok(())
}
