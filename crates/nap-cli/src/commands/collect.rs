//! `nap collect` - raw telemetry collection

use crate::output::{print_info, print_success, print_warning, prompt};
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Args;
use nap_lib::collector::{Collector, CollectorConfig};
use nap_lib::storage::SampleWriter;
use nap_lib::zabbix::ZabbixClientBuilder;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct CollectArgs {
    /// Monitoring server; a bare host is expanded to
    /// http://<host>/zabbix/api_jsonrpc.php
    #[arg(long, env = "NAP_ZABBIX_URL")]
    pub url: String,

    /// API username (prompted when omitted)
    #[arg(long, env = "NAP_ZABBIX_USER")]
    pub username: Option<String>,

    /// API password (prompted when omitted)
    #[arg(long, env = "NAP_ZABBIX_PASSWORD")]
    pub password: Option<String>,

    /// Start of the collection range, `YYYY-MM-DD HH:MM` (UTC)
    #[arg(long, default_value = "2025-08-10 00:00")]
    pub since: String,

    /// End of the collection range (defaults to now)
    #[arg(long)]
    pub until: Option<String>,

    /// Output CSV path
    #[arg(long, short, default_value = "samples.csv")]
    pub output: PathBuf,

    /// Item name pattern to collect (repeatable; defaults built in)
    #[arg(long = "item")]
    pub items: Vec<String>,

    /// Host display name to exclude (repeatable)
    #[arg(long = "exclude-host")]
    pub exclude_hosts: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Attempts per API call
    #[arg(long, default_value_t = 3)]
    pub attempts: u32,

    /// Delay between attempts in seconds
    #[arg(long, default_value_t = 30)]
    pub retry_delay: u64,
}

pub async fn run(args: CollectArgs, settings: &Settings) -> Result<()> {
    let endpoint = normalize_endpoint(&args.url);
    let since = parse_bound(&args.since)
        .with_context(|| format!("invalid --since value `{}`", args.since))?;
    let until = match &args.until {
        Some(raw) => {
            parse_bound(raw).with_context(|| format!("invalid --until value `{raw}`"))?
        }
        None => Utc::now().timestamp(),
    };
    if until <= since {
        bail!("collection range is empty: until <= since");
    }

    let username = match args.username {
        Some(name) => name,
        None => prompt("Username")?,
    };
    let password = match args.password {
        Some(pass) => pass,
        None => prompt("Password")?,
    };

    let mut client = ZabbixClientBuilder::new(endpoint)
        .request_timeout(Duration::from_secs(args.timeout))
        .attempts(args.attempts)
        .retry_delay(Duration::from_secs(args.retry_delay))
        .build()?;
    client
        .login(&username, &password)
        .await
        .context("authentication against the monitoring API failed")?;
    print_info(&format!("authenticated against {}", client.endpoint()));

    let mut config = CollectorConfig::for_range(since, until);
    if !args.items.is_empty() {
        config.item_patterns = args.items;
    } else if !settings.item_patterns.is_empty() {
        config.item_patterns = settings.item_patterns.clone();
    }
    config.excluded_hosts.extend(args.exclude_hosts);
    config.excluded_hosts.extend(settings.excluded_hosts.clone());

    let mut writer = SampleWriter::create(&args.output)
        .with_context(|| format!("cannot open output {:?}", args.output))?;

    let collector = Collector::new(&client, config);
    let summary = collector.run(&mut writer).await?;
    writer.flush()?;

    print_success(&format!(
        "collected {} rows from {} hosts into {}",
        summary.rows_written,
        summary.hosts_total - summary.hosts_excluded - summary.hosts_failed,
        args.output.display()
    ));
    if summary.hosts_excluded > 0 {
        print_info(&format!("{} hosts excluded by name", summary.hosts_excluded));
    }
    if summary.hosts_failed > 0 || summary.items_skipped > 0 {
        print_warning(&format!(
            "{} hosts and {} items skipped after failures or empty ranges",
            summary.hosts_failed, summary.items_skipped
        ));
    }
    Ok(())
}

/// Expand a bare host into the conventional JSON-RPC endpoint path.
fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("api_jsonrpc.php") {
        trimmed.to_string()
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{trimmed}/zabbix/api_jsonrpc.php")
    } else {
        format!("http://{trimmed}/zabbix/api_jsonrpc.php")
    }
}

/// Parse a range bound as UTC
fn parse_bound(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp());
        }
        if format == "%Y-%m-%d" {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, format) {
                if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                    return Ok(naive.and_utc().timestamp());
                }
            }
        }
    }
    bail!("unsupported date format `{raw}`")
}
