//! Fixed-window aggregation over the wide table
//!
//! Buckets each host's rows into fixed-width windows on the local (zone-
//! normalized) clock and computes the configured statistics per column.
//! Windows are emitted for every bucket between a host's first and last
//! sample, labeled by the window's right edge; a window with no samples
//! yields a row of all-missing statistics.

use super::pivot::WideTable;
use super::FeatureConfig;
use chrono::{DateTime, LocalResult, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Aggregation statistic for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Mean,
    Std,
    Min,
    Max,
    Sum,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Std => "std",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Sum => "sum",
        }
    }

    /// Apply to the present values of one window. Empty input is missing,
    /// never an error; `std` needs at least two values.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Stat::Mean => mean(values),
            Stat::Std => std_dev(values),
            Stat::Min => minimum(values),
            Stat::Max => maximum(values),
            Stat::Sum => total(values),
        }
    }
}

/// Windowed feature table: one row per (host, window)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// `{item}_{statistic}` column names
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

/// One windowed row for one host
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub host: String,
    /// Right edge of the window, rendered in the configured timezone
    pub window: String,
    /// One slot per column; missing aggregates stay `None`
    pub values: Vec<Option<f64>>,
}

/// Deterministic column name: `{item}_{statistic}`, lowercased, spaces to
/// underscores.
pub fn feature_column(item: &str, stat: Stat) -> String {
    format!("{}_{}", item, stat.as_str())
        .to_lowercase()
        .replace(' ', "_")
}

/// Aggregate a wide table into fixed windows.
pub fn aggregate(
    wide: &WideTable,
    config: &FeatureConfig,
    window_seconds: i64,
    tz: &Tz,
) -> FeatureTable {
    let specs: Vec<(usize, &str, &[Stat])> = wide
        .columns
        .iter()
        .enumerate()
        .map(|(idx, item)| (idx, item.as_str(), config.stats_for(item)))
        .collect();

    let columns: Vec<String> = specs
        .iter()
        .flat_map(|(_, item, stats)| stats.iter().map(|s| feature_column(item, *s)))
        .collect();

    let mut rows = Vec::new();
    for (host, series) in &wide.hosts {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            continue;
        };
        let first_bucket = local_seconds(first.epoch, tz).div_euclid(window_seconds);
        let last_bucket = local_seconds(last.epoch, tz).div_euclid(window_seconds);

        let mut cursor = 0usize;
        for bucket in first_bucket..=last_bucket {
            let start = cursor;
            while cursor < series.len()
                && local_seconds(series[cursor].epoch, tz).div_euclid(window_seconds) == bucket
            {
                cursor += 1;
            }
            let in_window = &series[start..cursor];

            let mut values = Vec::with_capacity(columns.len());
            for (idx, _, stats) in &specs {
                let present: Vec<f64> = in_window
                    .iter()
                    .filter_map(|row| row.values[*idx])
                    .collect();
                for stat in *stats {
                    values.push(stat.apply(&present));
                }
            }

            rows.push(FeatureRow {
                host: host.clone(),
                window: window_label((bucket + 1) * window_seconds, tz),
                values,
            });
        }
    }

    FeatureTable { columns, rows }
}

/// Wall-clock seconds of an instant in the given zone. Window boundaries
/// follow the local clock, matching zone-aware resampling.
fn local_seconds(epoch: i64, tz: &Tz) -> i64 {
    match tz.timestamp_opt(epoch, 0) {
        LocalResult::Single(dt) => dt.naive_local().and_utc().timestamp(),
        _ => epoch,
    }
}

/// Render a local wall-clock second count as an offset-aware timestamp.
fn window_label(local_end: i64, tz: &Tz) -> String {
    let Some(naive) = DateTime::from_timestamp(local_end, 0).map(|dt| dt.naive_utc()) else {
        return local_end.to_string();
    };
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            dt.to_rfc3339_opts(SecondsFormat::Secs, false)
        }
        LocalResult::None => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); missing below two values.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn minimum(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn maximum(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn total(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum())
}
