//! File persistence for pipeline artifacts
//!
//! Long-format raw samples and windowed feature tables are CSV; split
//! index arrays are a single bincode file written atomically.

use crate::dataset::SplitIndices;
use crate::features::FeatureTable;
use crate::models::RawSample;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Writer for long-format raw samples with per-host flushing
pub struct SampleWriter {
    inner: csv::Writer<File>,
    rows: usize,
}

impl SampleWriter {
    /// Create (truncate) the output file; the header row comes from the
    /// `RawSample` field names on first write.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {:?}", parent))?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create sample output {:?}", path))?;
        Ok(Self {
            inner: csv::Writer::from_writer(file),
            rows: 0,
        })
    }

    pub fn write(&mut self, sample: &RawSample) -> Result<()> {
        self.inner
            .serialize(sample)
            .context("failed to write sample row")?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("failed to flush sample output")
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

/// Read a long-format raw sample CSV.
pub fn read_samples(path: &Path) -> Result<Vec<RawSample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open sample input {:?}", path))?;
    let mut samples = Vec::new();
    for record in reader.deserialize() {
        let sample: RawSample = record.context("malformed sample row")?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Write a windowed feature table. Missing aggregates become empty cells;
/// float formatting uses the shortest round-trip representation, so
/// identical tables produce byte-identical files.
pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create feature output {:?}", path))?;

    let mut header = vec!["timestamp".to_string(), "host".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header).context("failed to write header")?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(table.columns.len() + 2);
        record.push(row.window.clone());
        record.push(row.host.clone());
        for value in &row.values {
            record.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record).context("failed to write feature row")?;
    }

    writer.flush().context("failed to flush feature output")?;
    Ok(())
}

/// Persist split index arrays to one binary file, atomically.
pub fn save_indices(path: &Path, indices: &SplitIndices) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
    }

    let encoded = bincode::serialize(indices).context("failed to encode split indices")?;

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("failed to create temp file {:?}", temp_path))?;
    file.write_all(&encoded).context("failed to write split indices")?;
    file.sync_all().context("failed to sync split indices")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename {:?} to {:?}", temp_path, path))?;
    Ok(())
}

/// Load split index arrays written by [`save_indices`].
pub fn load_indices(path: &Path) -> Result<SplitIndices> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read split indices {:?}", path))?;
    bincode::deserialize(&data).context("failed to decode split indices")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;

    fn sample(timestamp: &str, host: &str, item: &str, value: f64) -> RawSample {
        RawSample {
            timestamp: timestamp.to_string(),
            host: host.to_string(),
            item: item.to_string(),
            value,
        }
    }

    #[test]
    fn test_sample_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");

        let rows = vec![
            sample("2024-08-10T00:00:00Z", "ap-1", "ICMP ping", 1.0),
            sample("2024-08-10T00:01:00Z", "ap-1", "ICMP response time", 0.0042),
        ];

        let mut writer = SampleWriter::create(&path).unwrap();
        for row in &rows {
            writer.write(row).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(writer.rows_written(), 2);
        drop(writer);

        let read = read_samples(&path).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_feature_table_missing_cells_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");

        let table = FeatureTable {
            columns: vec!["icmp_ping_mean".to_string(), "icmp_ping_std".to_string()],
            rows: vec![FeatureRow {
                host: "ap-1".to_string(),
                window: "2024-08-10T01:00:00-05:00".to_string(),
                values: vec![Some(1.0), None],
            }],
        };
        write_feature_table(&path, &table).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,host,icmp_ping_mean,icmp_ping_std")
        );
        assert_eq!(lines.next(), Some("2024-08-10T01:00:00-05:00,ap-1,1,"));
    }

    #[test]
    fn test_indices_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splits.bin");

        let indices = SplitIndices {
            train: vec![0, 2, 4],
            val: vec![1, 5],
            test: vec![3],
        };
        save_indices(&path, &indices).unwrap();

        let loaded = load_indices(&path).unwrap();
        assert_eq!(loaded.train, indices.train);
        assert_eq!(loaded.val, indices.val);
        assert_eq!(loaded.test, indices.test);
        assert!(!path.with_extension("tmp").exists());
    }
}
