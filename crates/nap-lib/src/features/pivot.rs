//! Long-to-wide pivoting
//!
//! One wide row per (host, timestamp), one column per item name. Duplicate
//! (host, timestamp, item) readings collapse keep-first. Hosts, rows, and
//! columns are kept in sorted order so downstream output is deterministic.

use crate::models::RawSample;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};

/// Wide table indexed by (host, timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// Item names, sorted
    pub columns: Vec<String>,
    /// Rows per host, sorted by timestamp
    pub hosts: BTreeMap<String, Vec<WideRow>>,
}

/// One wide row: a host's readings at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    /// Unix timestamp in seconds
    pub epoch: i64,
    /// One slot per column; absent readings stay `None`
    pub values: Vec<Option<f64>>,
}

impl WideTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rewrite one column per host. The closure receives the host's full
    /// series in timestamp order and returns a series of the same length.
    /// Missing columns are a no-op.
    pub fn transform_column<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for rows in self.hosts.values_mut() {
            let series: Vec<Option<f64>> = rows.iter().map(|r| r.values[idx]).collect();
            let rewritten = f(&series);
            debug_assert_eq!(rewritten.len(), rows.len());
            for (row, value) in rows.iter_mut().zip(rewritten) {
                row.values[idx] = value;
            }
        }
    }

    /// Add a column derived per host from `source`, keeping columns sorted.
    /// No-op when the source is missing or the name already exists.
    pub fn derive_column<F>(&mut self, name: &str, source: &str, f: F)
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        let Some(src_idx) = self.column_index(source) else {
            return;
        };
        let insert_at = match self.columns.binary_search(&name.to_string()) {
            Ok(_) => return,
            Err(pos) => pos,
        };

        self.columns.insert(insert_at, name.to_string());
        for rows in self.hosts.values_mut() {
            let series: Vec<Option<f64>> = rows.iter().map(|r| r.values[src_idx]).collect();
            let derived = f(&series);
            debug_assert_eq!(derived.len(), rows.len());
            for (row, value) in rows.iter_mut().zip(derived) {
                row.values.insert(insert_at, value);
            }
        }
    }
}

/// Parse a sample timestamp into Unix seconds. Offset-aware values are
/// converted; naive values are localized in `tz`.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp())
                .with_context(|| format!("timestamp `{raw}` does not exist in {tz}"));
        }
    }
    bail!("unsupported timestamp format: `{raw}`")
}

/// Pivot long-format samples into a wide table.
pub fn pivot(samples: &[RawSample], tz: &Tz) -> Result<WideTable> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    // host -> epoch -> item -> value, keep-first on duplicates
    let mut cells: BTreeMap<String, BTreeMap<i64, BTreeMap<String, f64>>> = BTreeMap::new();

    for sample in samples {
        let epoch = parse_timestamp(&sample.timestamp, tz)
            .with_context(|| format!("bad timestamp on host {}", sample.host))?;
        columns.insert(sample.item.clone());
        cells
            .entry(sample.host.clone())
            .or_default()
            .entry(epoch)
            .or_default()
            .entry(sample.item.clone())
            .or_insert(sample.value);
    }

    let columns: Vec<String> = columns.into_iter().collect();
    let hosts = cells
        .into_iter()
        .map(|(host, by_time)| {
            let rows = by_time
                .into_iter()
                .map(|(epoch, items)| WideRow {
                    epoch,
                    values: columns.iter().map(|c| items.get(c).copied()).collect(),
                })
                .collect();
            (host, rows)
        })
        .collect();

    Ok(WideTable { columns, hosts })
}
