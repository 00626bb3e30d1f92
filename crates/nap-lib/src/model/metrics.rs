//! Binary classification metrics
//!
//! Accuracy, F1 on the positive class, and AUROC computed from ranks with
//! average tie handling. Degenerate inputs (empty partitions, a single
//! class) yield the conventional fallbacks instead of errors.

use serde::Serialize;

/// Metric triple reported per partition
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BinaryMetrics {
    pub accuracy: f64,
    pub f1: f64,
    pub auroc: f64,
}

/// Fraction of matching predictions; 0.0 on empty input.
pub fn accuracy(preds: &[i64], targets: &[i64]) -> f64 {
    if preds.is_empty() {
        return 0.0;
    }
    let hits = preds
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count();
    hits as f64 / preds.len() as f64
}

/// F1 score of the positive class (label 1); 0.0 when precision and recall
/// are both undefined or zero.
pub fn f1_score(preds: &[i64], targets: &[i64]) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&p, &t) in preds.iter().zip(targets) {
        match (p, t) {
            (1, 1) => tp += 1,
            (1, _) => fp += 1,
            (_, 1) => fn_ += 1,
            _ => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / denom as f64
}

/// Area under the ROC curve via the rank-sum statistic, averaging ranks
/// over score ties. 0.5 when either class is absent.
pub fn auroc(scores: &[f64], targets: &[i64]) -> f64 {
    let n_pos = targets.iter().filter(|&&t| t == 1).count();
    let n_neg = targets.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // average ranks over tied scores
    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0usize;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let rank = (i + 1 + j + 1) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = targets
        .iter()
        .enumerate()
        .filter(|(_, &t)| t == 1)
        .map(|(idx, _)| ranks[idx])
        .sum();

    (positive_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64
}

/// All three metrics from positive-class probabilities and hard predictions.
pub fn evaluate_binary(probs: &[f64], preds: &[i64], targets: &[i64]) -> BinaryMetrics {
    BinaryMetrics {
        accuracy: accuracy(preds, targets),
        f1: f1_score(preds, targets),
        auroc: auroc(probs, targets),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 0, 1, 1], &[1, 0, 0, 1]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_f1_score_known_values() {
        // tp=2, fp=1, fn=1 -> f1 = 4 / (4 + 1 + 1)
        let preds = [1, 1, 1, 0, 0];
        let targets = [1, 1, 0, 1, 0];
        assert!((f1_score(&preds, &targets) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_f1_score_degenerate() {
        assert_eq!(f1_score(&[0, 0], &[0, 0]), 0.0);
    }

    #[test]
    fn test_auroc_perfect_separation() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let targets = [0, 0, 1, 1];
        assert!((auroc(&scores, &targets) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_auroc_inverted_scores() {
        let scores = [0.9, 0.8, 0.2, 0.1];
        let targets = [0, 0, 1, 1];
        assert!(auroc(&scores, &targets).abs() < 1e-12);
    }

    #[test]
    fn test_auroc_ties_average() {
        // all scores equal: chance level
        let scores = [0.5, 0.5, 0.5, 0.5];
        let targets = [0, 1, 0, 1];
        assert!((auroc(&scores, &targets) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auroc_single_class() {
        assert_eq!(auroc(&[0.3, 0.7], &[1, 1]), 0.5);
    }
}
