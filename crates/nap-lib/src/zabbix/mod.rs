//! Zabbix-style monitoring API access
//!
//! The API speaks JSON-RPC 2.0 over plain HTTP. Every scalar in its
//! responses arrives as a JSON string, so the wire types here keep string
//! fields and expose parsing accessors.

mod client;
mod types;

pub use client::{ClientConfig, ZabbixClient, ZabbixClientBuilder};
pub use types::{Host, Item, RpcError, TrendPoint, HistoryPoint};

use thiserror::Error;

/// Errors from the monitoring API client.
///
/// No distinction is made between transient and permanent failures: the
/// retry budget applies to all of them, and callers treat an exhausted
/// budget as "no data, skip".
#[derive(Debug, Error)]
pub enum ZabbixError {
    #[error("invalid endpoint `{0}`")]
    Endpoint(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("API error calling {method}: {code} {message}")]
    Api {
        method: String,
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("malformed response for {method}: {reason}")]
    Malformed { method: String, reason: String },

    #[error("not authenticated: login first")]
    NotAuthenticated,
}
