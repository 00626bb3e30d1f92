//! Collection run over hosts and items
//!
//! Output rows are appended per host and the writer is flushed after each,
//! so an interrupted run keeps everything collected so far.

use super::rates::RateConverter;
use super::TelemetrySource;
use crate::models::{CollectionSummary, RawSample};
use crate::storage::SampleWriter;
use crate::zabbix::{Host, Item};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Item name patterns collected by default.
pub const DEFAULT_ITEM_PATTERNS: &[&str] = &[
    "ICMP loss",
    "ICMP ping",
    "ICMP response time",
    "Trafico LAN Recibido",
    "Trafico LAN Transmitido",
    "Trafico WLAN Recibido - 2.4GHz",
    "Trafico WLAN Transmitido - 2.4GHz",
    "Trafico WLAN Recibido - 5GHz",
    "Trafico WLAN Transmitido - 5GHz",
    "Uptime (network)",
];

/// Configuration for one collection run
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Item name patterns to fetch per host
    #[serde(default = "default_item_patterns")]
    pub item_patterns: Vec<String>,

    /// Host display names to drop, matched case-insensitively
    #[serde(default = "default_excluded_hosts")]
    pub excluded_hosts: Vec<String>,

    /// Name fragments marking cumulative counter items, matched
    /// case-insensitively; matching series are converted to bps rates
    #[serde(default = "default_counter_patterns")]
    pub counter_patterns: Vec<String>,

    /// Start of the collection range (Unix seconds)
    pub time_from: i64,

    /// End of the collection range (Unix seconds)
    pub time_till: i64,
}

fn default_item_patterns() -> Vec<String> {
    DEFAULT_ITEM_PATTERNS.iter().map(|s| s.to_string()).collect()
}

fn default_excluded_hosts() -> Vec<String> {
    vec!["zabbix server".to_string()]
}

fn default_counter_patterns() -> Vec<String> {
    vec!["trafico".to_string(), "traffic".to_string()]
}

impl CollectorConfig {
    /// Config with default patterns over the given range
    pub fn for_range(time_from: i64, time_till: i64) -> Self {
        Self {
            item_patterns: default_item_patterns(),
            excluded_hosts: default_excluded_hosts(),
            counter_patterns: default_counter_patterns(),
            time_from,
            time_till,
        }
    }

    fn is_counter_item(&self, item_name: &str) -> bool {
        let lower = item_name.to_lowercase();
        self.counter_patterns
            .iter()
            .any(|pattern| lower.contains(&pattern.to_lowercase()))
    }
}

/// Drives a [`TelemetrySource`] over hosts x items and writes long rows
pub struct Collector<'a> {
    source: &'a dyn TelemetrySource,
    config: CollectorConfig,
}

impl<'a> Collector<'a> {
    pub fn new(source: &'a dyn TelemetrySource, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    /// Run the collection, appending rows to `writer`.
    pub async fn run(&self, writer: &mut SampleWriter) -> Result<CollectionSummary> {
        let hosts = self
            .source
            .hosts()
            .await
            .context("failed to resolve hosts from the monitoring API")?;

        let excluded: HashSet<String> = self
            .config
            .excluded_hosts
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();

        let mut summary = CollectionSummary {
            hosts_total: hosts.len(),
            ..Default::default()
        };

        info!(hosts = hosts.len(), "starting collection run");

        for host in &hosts {
            let host_name = host.display_name();
            if excluded.contains(&host_name.to_lowercase()) {
                debug!(host = %host_name, "host excluded");
                summary.hosts_excluded += 1;
                continue;
            }

            match self.collect_host(host, &host_name, writer, &mut summary).await {
                Ok(rows) => {
                    info!(host = %host_name, rows, "host collected");
                }
                Err(e) => {
                    warn!(host = %host_name, error = %e, "skipping host after collection failure");
                    summary.hosts_failed += 1;
                }
            }

            // partial save: whatever is collected so far survives a crash
            writer.flush().context("failed to flush sample output")?;
        }

        summary.rows_written = writer.rows_written();
        info!(
            rows = summary.rows_written,
            items = summary.items_collected,
            skipped = summary.items_skipped,
            "collection run complete"
        );
        Ok(summary)
    }

    async fn collect_host(
        &self,
        host: &Host,
        host_name: &str,
        writer: &mut SampleWriter,
        summary: &mut CollectionSummary,
    ) -> Result<usize> {
        let items = self
            .source
            .items(&host.hostid, &self.config.item_patterns)
            .await
            .with_context(|| format!("failed to resolve items for host {host_name}"))?;

        let mut rows = 0usize;
        for item in &items {
            match self.collect_item(host_name, item, writer).await {
                Ok(0) => summary.items_skipped += 1,
                Ok(n) => {
                    summary.items_collected += 1;
                    rows += n;
                }
                Err(e) => {
                    warn!(host = %host_name, item = %item.name, error = %e, "skipping item");
                    summary.items_skipped += 1;
                }
            }
        }
        Ok(rows)
    }

    async fn collect_item(
        &self,
        host_name: &str,
        item: &Item,
        writer: &mut SampleWriter,
    ) -> Result<usize> {
        let points = self
            .source
            .series(item, self.config.time_from, self.config.time_till)
            .await?;
        if points.is_empty() {
            debug!(host = %host_name, item = %item.name, "no data in range");
            return Ok(0);
        }

        let mut written = 0usize;
        if self.config.is_counter_item(&item.name) {
            for rate in RateConverter::convert(&points) {
                if let Some(timestamp) = format_timestamp(rate.clock) {
                    writer.write(&RawSample {
                        timestamp,
                        host: host_name.to_string(),
                        item: item.name.clone(),
                        value: rate.bps,
                    })?;
                    written += 1;
                }
            }
        } else {
            for point in &points {
                if let Some(timestamp) = format_timestamp(point.clock) {
                    writer.write(&RawSample {
                        timestamp,
                        host: host_name.to_string(),
                        item: item.name.clone(),
                        value: point.value,
                    })?;
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}

/// RFC 3339 UTC rendering of a Unix timestamp; out-of-range clocks are
/// excluded like any other bad reading.
fn format_timestamp(clock: i64) -> Option<String> {
    DateTime::from_timestamp(clock, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesPoint;
    use crate::zabbix::ZabbixError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Mock source serving canned series per (hostid, itemid)
    struct MockSource {
        hosts: Vec<Host>,
        items: BTreeMap<String, Vec<Item>>,
        series: BTreeMap<String, Vec<SeriesPoint>>,
        failing_items: Vec<String>,
    }

    #[async_trait]
    impl TelemetrySource for MockSource {
        async fn hosts(&self) -> Result<Vec<Host>, ZabbixError> {
            Ok(self.hosts.clone())
        }

        async fn items(
            &self,
            hostid: &str,
            _patterns: &[String],
        ) -> Result<Vec<Item>, ZabbixError> {
            Ok(self.items.get(hostid).cloned().unwrap_or_default())
        }

        async fn series(
            &self,
            item: &Item,
            _from: i64,
            _till: i64,
        ) -> Result<Vec<SeriesPoint>, ZabbixError> {
            if self.failing_items.contains(&item.itemid) {
                return Err(ZabbixError::Transport {
                    method: "history.get".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.series.get(&item.itemid).cloned().unwrap_or_default())
        }
    }

    fn host(hostid: &str, name: &str) -> Host {
        Host {
            hostid: hostid.to_string(),
            host: format!("{hostid}.lan"),
            name: Some(name.to_string()),
        }
    }

    fn item(itemid: &str, name: &str) -> Item {
        Item {
            itemid: itemid.to_string(),
            name: name.to_string(),
            key: "key".to_string(),
            value_type: "0".to_string(),
        }
    }

    fn points(raw: &[(i64, f64)]) -> Vec<SeriesPoint> {
        raw.iter()
            .map(|&(clock, value)| SeriesPoint { clock, value })
            .collect()
    }

    async fn run_collector(source: &MockSource) -> (CollectionSummary, Vec<RawSample>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let mut writer = SampleWriter::create(&path).unwrap();

        let collector = Collector::new(source, CollectorConfig::for_range(0, 1_000_000));
        let summary = collector.run(&mut writer).await.unwrap();
        drop(writer);

        let samples = crate::storage::read_samples(&path).unwrap();
        (summary, samples)
    }

    #[tokio::test]
    async fn test_excluded_host_is_skipped() {
        let source = MockSource {
            hosts: vec![host("1", "Zabbix Server"), host("2", "ap-floor-1")],
            items: BTreeMap::from([(
                "2".to_string(),
                vec![item("10", "ICMP response time")],
            )]),
            series: BTreeMap::from([("10".to_string(), points(&[(100, 0.01), (200, 0.02)]))]),
            failing_items: vec![],
        };

        let (summary, samples) = run_collector(&source).await;

        assert_eq!(summary.hosts_total, 2);
        assert_eq!(summary.hosts_excluded, 1);
        assert_eq!(summary.rows_written, 2);
        assert!(samples.iter().all(|s| s.host == "ap-floor-1"));
    }

    #[tokio::test]
    async fn test_failing_item_does_not_stop_collection() {
        let source = MockSource {
            hosts: vec![host("1", "ap-floor-1")],
            items: BTreeMap::from([(
                "1".to_string(),
                vec![item("10", "ICMP ping"), item("11", "ICMP response time")],
            )]),
            series: BTreeMap::from([
                ("10".to_string(), points(&[(100, 1.0)])),
                ("11".to_string(), points(&[(100, 0.01)])),
            ]),
            failing_items: vec!["10".to_string()],
        };

        let (summary, samples) = run_collector(&source).await;

        assert_eq!(summary.hosts_failed, 0);
        assert_eq!(summary.items_skipped, 1);
        assert_eq!(summary.items_collected, 1);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].item, "ICMP response time");
    }

    #[tokio::test]
    async fn test_counter_item_is_converted_to_rate() {
        let source = MockSource {
            hosts: vec![host("1", "ap-floor-1")],
            items: BTreeMap::from([(
                "1".to_string(),
                vec![item("10", "Trafico LAN Recibido")],
            )]),
            // 1000 octets / 10 s -> 800 bps
            series: BTreeMap::from([(
                "10".to_string(),
                points(&[(100, 0.0), (110, 1000.0), (120, 2000.0)]),
            )]),
            failing_items: vec![],
        };

        let (summary, samples) = run_collector(&source).await;

        assert_eq!(summary.rows_written, 2);
        for sample in &samples {
            assert!((sample.value - 800.0).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_empty_series_counts_as_skipped() {
        let source = MockSource {
            hosts: vec![host("1", "ap-floor-1")],
            items: BTreeMap::from([("1".to_string(), vec![item("10", "ICMP loss")])]),
            series: BTreeMap::new(),
            failing_items: vec![],
        };

        let (summary, samples) = run_collector(&source).await;

        assert_eq!(summary.items_skipped, 1);
        assert_eq!(summary.items_collected, 0);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_counter_pattern_matching() {
        let config = CollectorConfig::for_range(0, 1);
        assert!(config.is_counter_item("Trafico WLAN Recibido - 5GHz"));
        assert!(config.is_counter_item("Interface traffic in"));
        assert!(!config.is_counter_item("ICMP response time"));
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(
            format_timestamp(1723248000).as_deref(),
            Some("2024-08-10T00:00:00Z")
        );
    }
}
