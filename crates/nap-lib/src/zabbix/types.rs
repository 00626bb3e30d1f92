//! Wire types for the monitoring API

use crate::models::SeriesPoint;
use serde::Deserialize;

/// A monitored host as returned by `host.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct Host {
    pub hostid: String,
    pub host: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Host {
    /// Display name: visible name when set, technical name otherwise.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.host.trim())
            .to_string()
    }
}

/// A monitored item as returned by `item.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub itemid: String,
    pub name: String,
    #[serde(rename = "key_")]
    pub key: String,
    pub value_type: String,
}

impl Item {
    /// History table to query: 0 for float items, 3 for everything else.
    pub fn history_kind(&self) -> i64 {
        if self.value_type.trim() == "0" {
            0
        } else {
            3
        }
    }
}

/// One `history.get` row.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPoint {
    pub clock: String,
    pub value: String,
}

impl HistoryPoint {
    /// Parse into a series point; unparsable rows are excluded, not errors.
    pub fn to_point(&self) -> Option<SeriesPoint> {
        Some(SeriesPoint {
            clock: self.clock.trim().parse().ok()?,
            value: self.value.trim().parse().ok()?,
        })
    }
}

/// One `trend.get` row; trends carry per-hour aggregates instead of values.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendPoint {
    pub clock: String,
    pub value_avg: String,
}

impl TrendPoint {
    pub fn to_point(&self) -> Option<SeriesPoint> {
        Some(SeriesPoint {
            clock: self.clock.trim().parse().ok()?,
            value: self.value_avg.trim().parse().ok()?,
        })
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}
