//! Labeled dataset loading
//!
//! The balanced, hand-labeled feature table arrives either as a
//! spreadsheet workbook or as CSV. Required columns: `timestamp_ventana`
//! (window label), `host`, and the binary ground-truth `Y`; every other
//! column is a feature. Rows with any missing value are dropped and the
//! table is sorted by window timestamp before indexing, so saved index
//! sets stay valid across reloads.

mod split;

pub use split::{stratified_split, SplitConfig, SplitIndices};

use anyhow::{bail, Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{DateTime, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Ground-truth label column
pub const LABEL_COLUMN: &str = "Y";
/// Window timestamp column
pub const WINDOW_COLUMN: &str = "timestamp_ventana";
/// Host column
pub const HOST_COLUMN: &str = "host";

/// The labeled feature table, ready for splitting and training
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    /// Feature column names in file order
    pub feature_names: Vec<String>,
    pub hosts: Vec<String>,
    pub window_timestamps: Vec<String>,
    /// Row-major feature matrix
    pub features: Vec<Vec<f64>>,
    /// Binary labels
    pub labels: Vec<i64>,
}

impl LabeledDataset {
    /// Load from `.xlsx`/`.xls` or CSV, dispatching on the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match extension.as_str() {
            "xlsx" | "xls" => Self::from_workbook(path),
            _ => Self::from_csv(path),
        }
    }

    /// Load from a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open labeled dataset {:?}", path))?;

        let header: Vec<String> = reader
            .headers()
            .context("labeled dataset has no header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("malformed labeled row")?;
            let cells: Vec<Cell> = record.iter().map(Cell::from_text).collect();
            rows.push(cells);
        }

        Self::from_cells(header, rows)
    }

    /// Load from the first sheet of a spreadsheet workbook.
    pub fn from_workbook(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("failed to open workbook {:?}", path))?;
        let range = workbook
            .worksheet_range_at(0)
            .context("workbook has no sheets")?
            .context("failed to read first sheet")?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .context("workbook sheet is empty")?
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let rows: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(Cell::from_sheet).collect())
            .collect();

        Self::from_cells(header, rows)
    }

    fn from_cells(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let window_idx = column_index(&header, WINDOW_COLUMN)?;
        let host_idx = column_index(&header, HOST_COLUMN)?;
        let label_idx = column_index(&header, LABEL_COLUMN)?;

        let feature_indices: Vec<usize> = (0..header.len())
            .filter(|&i| i != window_idx && i != host_idx && i != label_idx)
            .collect();
        let feature_names: Vec<String> =
            feature_indices.iter().map(|&i| header[i].clone()).collect();
        if feature_names.is_empty() {
            bail!("labeled dataset has no feature columns");
        }

        // (sort key, window, host, features, label); incomplete rows dropped
        let mut parsed = Vec::new();
        let mut dropped = 0usize;
        for cells in &rows {
            let complete = (|| {
                let window = cells.get(window_idx)?.as_text()?;
                let sort_key = parse_sort_key(&window)?;
                let host = cells.get(host_idx)?.as_text()?;
                let label = cells.get(label_idx)?.as_f64()?.round() as i64;
                let mut features = Vec::with_capacity(feature_indices.len());
                for &idx in &feature_indices {
                    features.push(cells.get(idx)?.as_f64()?);
                }
                Some((sort_key, window, host, features, label))
            })();
            match complete {
                Some(row) => parsed.push(row),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, kept = parsed.len(), "dropped incomplete labeled rows");
        }
        if parsed.is_empty() {
            bail!("labeled dataset holds no complete rows");
        }

        parsed.sort_by_key(|(key, ..)| *key);
        debug!(rows = parsed.len(), features = feature_names.len(), "labeled dataset loaded");

        let mut dataset = LabeledDataset {
            feature_names,
            hosts: Vec::with_capacity(parsed.len()),
            window_timestamps: Vec::with_capacity(parsed.len()),
            features: Vec::with_capacity(parsed.len()),
            labels: Vec::with_capacity(parsed.len()),
        };
        for (_, window, host, features, label) in parsed {
            dataset.window_timestamps.push(window);
            dataset.hosts.push(host);
            dataset.features.push(features);
            dataset.labels.push(label);
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Label histogram
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

fn column_index(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("labeled dataset is missing the `{name}` column"))
}

/// Sort key for window timestamps; ordering only, no zone semantics.
fn parse_sort_key(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp());
        }
    }
    None
}

/// One table cell from either input format
#[derive(Debug, Clone)]
enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    fn from_sheet(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Data::String(s) => Cell::from_text(s),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => Cell::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => Cell::Empty,
            },
            Data::DateTimeIso(s) => Cell::from_text(s),
            Data::DurationIso(_) | Data::Error(_) => Cell::Empty,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.parse().ok(),
            Cell::Empty => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labeled.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_csv_and_sort() {
        let (_dir, path) = write_csv(
            "timestamp_ventana,host,icmp_ping_mean,jitter_mean,Y\n\
             2024-08-10 02:00:00,ap-1,0.9,4.0,1\n\
             2024-08-10 01:00:00,ap-2,1.0,2.5,0\n",
        );
        let dataset = LabeledDataset::load(&path).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.feature_names, vec!["icmp_ping_mean", "jitter_mean"]);
        // sorted by window timestamp
        assert_eq!(dataset.hosts, vec!["ap-2", "ap-1"]);
        assert_eq!(dataset.labels, vec![0, 1]);
        assert_eq!(dataset.features[0], vec![1.0, 2.5]);
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let (_dir, path) = write_csv(
            "timestamp_ventana,host,icmp_ping_mean,Y\n\
             2024-08-10 01:00:00,ap-1,1.0,0\n\
             2024-08-10 02:00:00,ap-1,,1\n\
             2024-08-10 03:00:00,ap-1,0.5,\n",
        );
        let dataset = LabeledDataset::load(&path).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.labels, vec![0]);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let (_dir, path) = write_csv(
            "timestamp_ventana,host,icmp_ping_mean\n2024-08-10 01:00:00,ap-1,1.0\n",
        );
        let err = LabeledDataset::load(&path).unwrap_err();
        assert!(err.to_string().contains("Y"));
    }

    #[test]
    fn test_class_counts() {
        let (_dir, path) = write_csv(
            "timestamp_ventana,host,f,Y\n\
             2024-08-10 01:00:00,ap-1,1.0,0\n\
             2024-08-10 02:00:00,ap-1,1.0,1\n\
             2024-08-10 03:00:00,ap-1,1.0,1\n",
        );
        let dataset = LabeledDataset::load(&path).unwrap();
        let counts = dataset.class_counts();
        assert_eq!(counts.get(&0), Some(&1));
        assert_eq!(counts.get(&1), Some(&2));
    }
}
