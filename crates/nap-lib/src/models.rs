//! Core data rows shared across the pipeline stages

use serde::{Deserialize, Serialize};

/// One long-format raw sample: a single reading of one item on one host.
///
/// `timestamp` is stored as text so that the same row type round-trips
/// through CSV regardless of whether it carries an RFC 3339 instant (what
/// the collector writes) or a naive `YYYY-MM-DD HH:MM:SS` value from an
/// externally produced file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: String,
    pub host: String,
    pub item: String,
    pub value: f64,
}

/// A normalized series point returned by the monitoring API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Unix timestamp in seconds
    pub clock: i64,
    pub value: f64,
}

/// An instantaneous rate derived from a cumulative counter transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    /// Unix timestamp of the later sample in the transition
    pub clock: i64,
    /// Rate in bits per second
    pub bps: f64,
}

/// Summary of one collection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Hosts returned by the API
    pub hosts_total: usize,
    /// Hosts dropped by the exclusion list
    pub hosts_excluded: usize,
    /// Hosts skipped entirely after a collection failure
    pub hosts_failed: usize,
    /// Items whose series contributed at least one row
    pub items_collected: usize,
    /// Items skipped because fetching or conversion yielded nothing
    pub items_skipped: usize,
    /// Long-format rows written to the output
    pub rows_written: usize,
}
