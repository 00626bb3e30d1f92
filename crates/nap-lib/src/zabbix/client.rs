//! JSON-RPC client for the monitoring API
//!
//! Retries every call a fixed number of times with a fixed delay; the auth
//! token from `user.login` is resent as the `auth` member of every
//! subsequent request. When `history.get` comes back empty the client falls
//! back to `trends.get` and normalizes both shapes into [`SeriesPoint`]s.

use super::types::{Host, HistoryPoint, Item, RpcError, TrendPoint};
use super::ZabbixError;
use crate::models::SeriesPoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the JSON-RPC client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the JSON-RPC endpoint (e.g. "http://zbx/zabbix/api_jsonrpc.php")
    pub endpoint: String,
    /// Per-request deadline
    pub request_timeout: Duration,
    /// Total attempts per call (first try included)
    pub attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Row cap passed to `history.get`
    pub history_limit: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/zabbix/api_jsonrpc.php".to_string(),
            request_timeout: Duration::from_secs(60),
            attempts: 3,
            retry_delay: Duration::from_secs(30),
            history_limit: 100_000,
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC client with token auth and fixed-delay retry
pub struct ZabbixClient {
    http: reqwest::Client,
    config: ClientConfig,
    auth: Option<String>,
    next_id: AtomicU64,
}

impl ZabbixClient {
    /// Create a new client for the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, ZabbixError> {
        url::Url::parse(&config.endpoint)
            .map_err(|_| ZabbixError::Endpoint(config.endpoint.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            config,
            auth: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Whether a login token is held
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Authenticate and keep the token for subsequent calls
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ZabbixError> {
        let params = json!({ "username": username, "password": password });
        let token: String = self.call("user.login", params).await?;
        self.auth = Some(token);
        debug!(endpoint = %self.config.endpoint, "authenticated against monitoring API");
        Ok(())
    }

    /// All hosts known to the API
    pub async fn hosts(&self) -> Result<Vec<Host>, ZabbixError> {
        self.require_auth()?;
        self.call("host.get", json!({ "output": ["hostid", "host", "name"] }))
            .await
    }

    /// Items on one host matching the given name patterns, de-duplicated by
    /// item id. A failing pattern is logged and skipped so that the
    /// remaining patterns still contribute.
    pub async fn items(&self, hostid: &str, patterns: &[String]) -> Result<Vec<Item>, ZabbixError> {
        self.require_auth()?;
        let mut items: Vec<Item> = Vec::new();
        for pattern in patterns {
            let params = json!({
                "output": ["itemid", "name", "key_", "value_type", "hostid"],
                "hostids": hostid,
                "search": { "name": pattern },
                "searchWildcardsEnabled": true,
            });
            match self.call::<Vec<Item>>("item.get", params).await {
                Ok(found) => items.extend(found),
                Err(e) => {
                    warn!(hostid, pattern = %pattern, error = %e, "item lookup failed, skipping pattern");
                }
            }
        }
        let mut seen = HashSet::new();
        items.retain(|it| seen.insert(it.itemid.clone()));
        Ok(items)
    }

    /// Historical series for one item over [from, till], sorted by clock.
    /// Falls back to trends when history holds nothing for the range.
    pub async fn series(
        &self,
        item: &Item,
        from: i64,
        till: i64,
    ) -> Result<Vec<SeriesPoint>, ZabbixError> {
        self.require_auth()?;
        let params = json!({
            "output": "extend",
            "history": item.history_kind(),
            "itemids": item.itemid,
            "time_from": from,
            "time_till": till,
            "sortfield": "clock",
            "sortorder": "ASC",
            "limit": self.config.history_limit,
        });
        let history: Vec<HistoryPoint> = self.call("history.get", params).await?;
        if !history.is_empty() {
            return Ok(Self::normalize(history.iter().filter_map(HistoryPoint::to_point)));
        }

        debug!(itemid = %item.itemid, "history empty, falling back to trends");
        let params = json!({
            "output": "extend",
            "itemids": item.itemid,
            "time_from": from,
            "time_till": till,
            "sortfield": "clock",
            "sortorder": "ASC",
        });
        let trends: Vec<TrendPoint> = self.call("trends.get", params).await?;
        Ok(Self::normalize(trends.iter().filter_map(TrendPoint::to_point)))
    }

    fn normalize(points: impl Iterator<Item = SeriesPoint>) -> Vec<SeriesPoint> {
        let mut points: Vec<SeriesPoint> = points.collect();
        points.sort_by_key(|p| p.clock);
        points
    }

    fn require_auth(&self) -> Result<(), ZabbixError> {
        if self.auth.is_none() {
            return Err(ZabbixError::NotAuthenticated);
        }
        Ok(())
    }

    /// One JSON-RPC call with the configured retry budget
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ZabbixError> {
        let attempts = self.config.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.call_once(method, &params).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(
                        method,
                        attempt,
                        attempts,
                        error = %e,
                        "monitoring API call failed"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ZabbixError::Malformed {
            method: method.to_string(),
            reason: "no attempts were made".to_string(),
        }))
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
    ) -> Result<T, ZabbixError> {
        // user.login must not carry a token
        let auth = if method == "user.login" {
            None
        } else {
            self.auth.as_deref()
        };
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            auth,
        };

        let transport = |e: reqwest::Error| ZabbixError::Transport {
            method: method.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        let body: RpcResponse<T> = response.json().await.map_err(transport)?;

        if let Some(error) = body.error {
            return Err(ZabbixError::Api {
                method: method.to_string(),
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        body.result.ok_or_else(|| ZabbixError::Malformed {
            method: method.to_string(),
            reason: "response carries neither result nor error".to_string(),
        })
    }
}

/// Builder for [`ZabbixClient`]
pub struct ZabbixClientBuilder {
    config: ClientConfig,
}

impl ZabbixClientBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let mut config = ClientConfig::default();
        config.endpoint = endpoint.into();
        Self { config }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn history_limit(mut self, limit: u64) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn build(self) -> Result<ZabbixClient, ZabbixError> {
        ZabbixClient::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> ZabbixClient {
        ZabbixClientBuilder::new(format!("{}/api_jsonrpc.php", server.url()))
            .attempts(2)
            .retry_delay(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    async fn logged_in_client(server: &mut mockito::ServerGuard) -> ZabbixClient {
        let login = server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"method":"user.login"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":"deadbeef","id":1}"#)
            .create_async()
            .await;
        let mut client = test_client(server);
        client.login("admin", "secret").await.unwrap();
        login.assert_async().await;
        client
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = ZabbixClientBuilder::new("not a url").build();
        assert!(matches!(result, Err(ZabbixError::Endpoint(_))));
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let mut server = mockito::Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_calls_require_login() {
        let server = mockito::Server::new_async().await;
        let client = test_client(&server);
        let result = client.hosts().await;
        assert!(matches!(result, Err(ZabbixError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let mut client = test_client(&server);

        let _mock = server
            .mock("POST", "/api_jsonrpc.php")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params.","data":"Incorrect user name or password."},"id":1}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let result = client.login("admin", "wrong").await;
        match result {
            Err(ZabbixError::Api { code, .. }) => assert_eq!(code, -32602),
            other => panic!("expected API error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let mut server = mockito::Server::new_async().await;
        let mut client = test_client(&server);

        let failure = server
            .mock("POST", "/api_jsonrpc.php")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("POST", "/api_jsonrpc.php")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":"deadbeef","id":1}"#)
            .expect(1)
            .create_async()
            .await;

        client.login("admin", "secret").await.unwrap();
        failure.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_falls_back_to_trends() {
        let mut server = mockito::Server::new_async().await;
        let mut client = logged_in_client(&mut server).await;
        // keep the retry budget out of the way for this test
        client.config.attempts = 1;

        let _history = server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"method":"history.get"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":[],"id":2}"#)
            .create_async()
            .await;
        let _trends = server
            .mock("POST", "/api_jsonrpc.php")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"method":"trends.get"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","result":[{"clock":"1723251600","value_avg":"12.5"},{"clock":"1723248000","value_avg":"10.0"}],"id":3}"#,
            )
            .create_async()
            .await;

        let item = Item {
            itemid: "42".to_string(),
            name: "Trafico LAN Recibido".to_string(),
            key: "net.if.in".to_string(),
            value_type: "3".to_string(),
        };
        let points = client.series(&item, 1723200000, 1723300000).await.unwrap();

        // normalized and sorted by clock
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].clock, 1723248000);
        assert!((points[0].value - 10.0).abs() < 1e-12);
        assert_eq!(points[1].clock, 1723251600);
    }
}
