//! Query execution against the ClickHouse HTTP interface.
//!
//! SQL is sent as the POST body and every external value travels as a
//! `param_<name>` URL parameter matched by a `{name:Type}` placeholder, so no
//! request input is ever spliced into SQL text.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::config;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A named SQL statement with its bound parameters.
///
/// The name labels logs and metrics; it never reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub name: &'static str,
    pub sql: String,
    pub params: BTreeMap<String, String>,
}

impl Query {
    pub fn new(name: &'static str, sql: impl Into<String>) -> Self {
        Self {
            name,
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind `value` to the `{name:Type}` placeholder in the SQL.
    #[must_use]
    pub fn bind(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

pub trait QueryExecutor: Send + Sync {
    /// Run `query` and return the store's native JSON result.
    ///
    /// The result is usually an envelope object; see [`crate::rows`].
    fn execute(&self, query: &Query) -> impl Future<Output = Result<Value, StoreError>> + Send;
}

pub struct ClickHouseClient {
    url: String,
    database: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl ClickHouseClient {
    pub fn new(config: &config::ClickHouse) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn url_params(&self, query: &Query) -> Vec<(String, String)> {
        let mut params = vec![
            ("database".to_string(), self.database.clone()),
            ("default_format".to_string(), "JSON".to_string()),
        ];
        params.extend(
            query
                .params
                .iter()
                .map(|(name, value)| (format!("param_{name}"), value.clone())),
        );
        params
    }

    async fn send(&self, query: &Query) -> Result<Value, StoreError> {
        let resp = self
            .client
            .post(&self.url)
            .query(&self.url_params(query))
            .header("X-ClickHouse-User", &self.username)
            .header("X-ClickHouse-Key", &self.password)
            .body(query.sql.clone())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl QueryExecutor for ClickHouseClient {
    async fn execute(&self, query: &Query) -> Result<Value, StoreError> {
        debug!(op = query.name, params = query.params.len(), "running store query");

        let start = Instant::now();
        let res = self.send(query).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = if res.is_ok() { "ok" } else { "err" };
        metrics::histogram!(
            "dashboard_store_query_latency_ms",
            "op" => query.name,
            "status" => status
        )
        .record(ms);

        if let Err(e) = &res {
            metrics::counter!("dashboard_store_query_errors_total", "op" => query.name)
                .increment(1);
            error!(op = query.name, error = %e, "store query failed");
        }

        res
    }
}
