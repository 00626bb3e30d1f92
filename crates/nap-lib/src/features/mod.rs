//! Windowed feature extraction
//!
//! Turns long-format raw samples into a per-host, per-window feature table:
//! timezone normalization, long-to-wide pivot, cumulative-counter
//! conversion, jitter derivation, and multi-statistic window aggregation.
//! Statistics are computed independently per host; re-running on identical
//! input produces identical output.

mod pivot;
mod window;

pub use pivot::{parse_timestamp, pivot, WideRow, WideTable};
pub use window::{aggregate, feature_column, FeatureRow, FeatureTable, Stat};

use crate::models::RawSample;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the derived jitter column.
pub const JITTER_ITEM: &str = "jitter";

/// Configuration for feature extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Window width in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// IANA timezone all timestamps are normalized into
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Item carrying ICMP latency; source of the jitter column
    #[serde(default = "default_latency_item")]
    pub latency_item: String,

    /// Scale the latency column from seconds to milliseconds
    #[serde(default = "default_true")]
    pub latency_seconds_to_millis: bool,

    /// Columns holding raw cumulative octet counters, converted to Mbit
    /// per sampling interval before windowing
    #[serde(default = "default_traffic_items")]
    pub traffic_items: Vec<String>,

    /// Statistics applied to columns without an override
    #[serde(default = "default_stats")]
    pub default_stats: Vec<Stat>,

    /// Per-item statistic overrides
    #[serde(default = "default_stat_overrides")]
    pub stat_overrides: BTreeMap<String, Vec<Stat>>,
}

fn default_window_minutes() -> u32 {
    60
}

fn default_timezone() -> String {
    "America/Guayaquil".to_string()
}

fn default_latency_item() -> String {
    "ICMP response time".to_string()
}

fn default_true() -> bool {
    true
}

fn default_traffic_items() -> Vec<String> {
    vec![
        "Trafico LAN Recibido".to_string(),
        "Trafico LAN Transmitido".to_string(),
    ]
}

fn default_stats() -> Vec<Stat> {
    vec![Stat::Mean, Stat::Std, Stat::Min, Stat::Max]
}

fn default_stat_overrides() -> BTreeMap<String, Vec<Stat>> {
    BTreeMap::from([
        ("Uptime (network)".to_string(), vec![Stat::Max]),
        (JITTER_ITEM.to_string(), vec![Stat::Mean, Stat::Max]),
    ])
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            timezone: default_timezone(),
            latency_item: default_latency_item(),
            latency_seconds_to_millis: default_true(),
            traffic_items: default_traffic_items(),
            default_stats: default_stats(),
            stat_overrides: default_stat_overrides(),
        }
    }
}

impl FeatureConfig {
    /// Statistics for one wide column
    pub fn stats_for(&self, item: &str) -> &[Stat] {
        self.stat_overrides
            .get(item)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_stats)
    }
}

/// Runs the full extraction over a long-format sample set
pub struct FeatureExtractor {
    config: FeatureConfig,
    tz: Tz,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown timezone `{}`", config.timezone))?;
        Ok(Self { config, tz })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract the windowed feature table from raw samples.
    pub fn extract(&self, samples: &[RawSample]) -> Result<FeatureTable> {
        let mut wide = pivot(samples, &self.tz).context("failed to pivot raw samples")?;

        for item in &self.config.traffic_items {
            wide.transform_column(item, counter_to_throughput);
        }

        if self.config.latency_seconds_to_millis {
            wide.transform_column(&self.config.latency_item, |series| {
                series.iter().map(|v| v.map(|ms| ms * 1000.0)).collect()
            });
        }

        wide.derive_column(JITTER_ITEM, &self.config.latency_item, absolute_difference);

        let window_seconds = i64::from(self.config.window_minutes) * 60;
        Ok(aggregate(&wide, &self.config, window_seconds, &self.tz))
    }
}

/// Cumulative octets to Mbit per sampling interval: first difference with
/// negative deltas (counter wrap within a sampling gap) clipped to zero,
/// then x8 / 1e6. The first reading of a host has no predecessor and
/// becomes missing.
fn counter_to_throughput(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; series.len()];
    for i in 1..series.len() {
        if let (Some(prev), Some(cur)) = (series[i - 1], series[i]) {
            out[i] = Some((cur - prev).max(0.0) * 8.0 / 1e6);
        }
    }
    out
}

/// Absolute first difference, the jitter definition.
fn absolute_difference(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; series.len()];
    for i in 1..series.len() {
        if let (Some(prev), Some(cur)) = (series[i - 1], series[i]) {
            out[i] = Some((cur - prev).abs());
        }
    }
    out
}
