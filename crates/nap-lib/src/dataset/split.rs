//! Stratified train/validation/test index splitting
//!
//! Deterministic two-stage split: 70/30 into train/test, then 67/33 of the
//! train branch into train/validation, both stratified on the binary label
//! with a fixed seed. The second stage splits positions within the train
//! branch and maps them back, so the same seed reproduces the same three
//! disjoint index sets on every run.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three persisted index partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Split configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SplitConfig {
    /// Fraction held out for test in the first stage
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Fraction of the train branch held out for validation
    #[serde(default = "default_val_fraction")]
    pub val_fraction: f64,
    /// RNG seed shared by both stages
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_test_fraction() -> f64 {
    0.30
}

fn default_val_fraction() -> f64 {
    0.33
}

fn default_seed() -> u64 {
    42
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            val_fraction: default_val_fraction(),
            seed: default_seed(),
        }
    }
}

/// Produce the three partitions over `0..labels.len()`.
pub fn stratified_split(labels: &[i64], config: &SplitConfig) -> Result<SplitIndices> {
    if labels.is_empty() {
        bail!("cannot split an empty dataset");
    }
    for (name, fraction) in [
        ("test_fraction", config.test_fraction),
        ("val_fraction", config.val_fraction),
    ] {
        if !(0.0..1.0).contains(&fraction) || fraction == 0.0 {
            bail!("{name} must be in (0, 1), got {fraction}");
        }
    }

    let all: Vec<usize> = (0..labels.len()).collect();
    let (train_branch, test) = holdout(&all, |i| labels[i], config.test_fraction, config.seed);
    if train_branch.is_empty() {
        bail!("test fraction {} leaves no training data", config.test_fraction);
    }

    // second stage over positions within the train branch, mapped back
    let positions: Vec<usize> = (0..train_branch.len()).collect();
    let (train_rel, val_rel) = holdout(
        &positions,
        |p| labels[train_branch[p]],
        config.val_fraction,
        config.seed,
    );

    let mut train: Vec<usize> = train_rel.iter().map(|&p| train_branch[p]).collect();
    let mut val: Vec<usize> = val_rel.iter().map(|&p| train_branch[p]).collect();
    train.sort_unstable();
    val.sort_unstable();

    Ok(SplitIndices { train, val, test })
}

/// One stratified holdout: per class, shuffle with the seed and hold out
/// `round(fraction * class size)` items. Returns (kept, holdout), sorted.
fn holdout<F>(items: &[usize], label_of: F, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>)
where
    F: Fn(usize) -> i64,
{
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &item in items {
        by_class.entry(label_of(item)).or_default().push(item);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut kept = Vec::new();
    let mut held = Vec::new();
    for (_, mut class_items) in by_class {
        class_items.shuffle(&mut rng);
        let n_held = ((class_items.len() as f64) * fraction).round() as usize;
        let n_held = n_held.min(class_items.len());
        held.extend_from_slice(&class_items[..n_held]);
        kept.extend_from_slice(&class_items[n_held..]);
    }
    kept.sort_unstable();
    held.sort_unstable();
    (kept, held)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Balanced binary labels, n per class
    fn balanced_labels(n: usize) -> Vec<i64> {
        (0..2 * n).map(|i| (i % 2) as i64).collect()
    }

    fn class_fraction(indices: &[usize], labels: &[i64], class: i64) -> f64 {
        let hits = indices.iter().filter(|&&i| labels[i] == class).count();
        hits as f64 / indices.len() as f64
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let labels = balanced_labels(100);
        let splits = stratified_split(&labels, &SplitConfig::default()).unwrap();

        let mut seen = HashSet::new();
        for index in splits
            .train
            .iter()
            .chain(&splits.val)
            .chain(&splits.test)
        {
            assert!(seen.insert(*index), "index {index} appears twice");
        }
        assert_eq!(seen.len(), labels.len());
        assert_eq!(splits.total(), labels.len());
    }

    #[test]
    fn test_partition_sizes() {
        let labels = balanced_labels(100);
        let splits = stratified_split(&labels, &SplitConfig::default()).unwrap();

        // 30% test, then 33% of the remaining 140 for validation
        assert_eq!(splits.test.len(), 60);
        assert_eq!(splits.val.len(), 46);
        assert_eq!(splits.train.len(), 94);
    }

    #[test]
    fn test_class_proportions_are_preserved() {
        let labels = balanced_labels(200);
        let splits = stratified_split(&labels, &SplitConfig::default()).unwrap();

        for partition in [&splits.train, &splits.val, &splits.test] {
            let fraction = class_fraction(partition, &labels, 1);
            assert!(
                (fraction - 0.5).abs() < 0.02,
                "positive fraction was {fraction}"
            );
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels = balanced_labels(50);
        let config = SplitConfig::default();
        let first = stratified_split(&labels, &config).unwrap();
        let second = stratified_split(&labels, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_changes_assignment() {
        let labels = balanced_labels(50);
        let first = stratified_split(&labels, &SplitConfig::default()).unwrap();
        let second = stratified_split(
            &labels,
            &SplitConfig {
                seed: 7,
                ..SplitConfig::default()
            },
        )
        .unwrap();
        assert_ne!(first, second);
        // sizes stay fixed regardless of seed
        assert_eq!(first.test.len(), second.test.len());
    }

    #[test]
    fn test_empty_labels_rejected() {
        assert!(stratified_split(&[], &SplitConfig::default()).is_err());
    }

    #[test]
    fn test_bad_fraction_rejected() {
        let labels = balanced_labels(10);
        let config = SplitConfig {
            test_fraction: 1.0,
            ..SplitConfig::default()
        };
        assert!(stratified_split(&labels, &config).is_err());
    }
}
