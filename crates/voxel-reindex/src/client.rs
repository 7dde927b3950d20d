//! HTTP client for the durable-orchestration engine.
//!
//! The engine owns reindex operations; this client only starts them and
//! polls their status. Response mapping is fixed by contract: 409 on start
//! means an overlapping operation is already in flight, 404 on status means
//! the engine does not know the id. Nothing is retried here; retry policy
//! belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use voxel_core::{defaults, Error, OperationStatus, ReindexClient, Result};

/// Engine endpoint configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ReindexClientConfig {
    /// Engine base URL, e.g. `http://localhost:7071/api`.
    pub base_url: String,
    /// Route for starting a reindex, relative to the base URL.
    pub start_route: String,
    /// Route prefix for operation status, relative to the base URL.
    pub status_route: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ReindexClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            start_route: defaults::ENGINE_START_REINDEX_ROUTE.to_string(),
            status_route: defaults::ENGINE_OPERATION_STATUS_ROUTE.to_string(),
            timeout: Duration::from_secs(defaults::ENGINE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartReindexRequest<'a> {
    tag_keys: &'a [i64],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartReindexResponse {
    operation_id: String,
}

/// Engine client over HTTP.
pub struct HttpReindexClient {
    client: Client,
    config: ReindexClientConfig,
}

impl HttpReindexClient {
    /// Create a new client from the given configuration.
    pub fn new(config: ReindexClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        info!(base_url = %config.base_url, "initializing reindex engine client");
        Self { client, config }
    }

    fn route(&self, parts: &[&str]) -> String {
        let mut url = self.config.base_url.trim_end_matches('/').to_string();
        for part in parts {
            url.push('/');
            url.push_str(part.trim_matches('/'));
        }
        url
    }
}

#[async_trait]
impl ReindexClient for HttpReindexClient {
    async fn start_reindex(&self, tag_keys: &[i64]) -> Result<String> {
        let url = self.route(&[&self.config.start_route]);
        debug!(url = %url, count = tag_keys.len(), "starting reindex operation");

        let response = self
            .client
            .post(&url)
            .json(&StartReindexRequest { tag_keys })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: StartReindexResponse = response.json().await?;
            info!(operation_id = %body.operation_id, "reindex operation started");
            return Ok(body.operation_id);
        }

        if status == StatusCode::CONFLICT {
            return Err(Error::AlreadyExists(format!(
                "a reindex operation is already in flight for tag keys {tag_keys:?}"
            )));
        }

        Err(Error::Transport {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    async fn get_status(&self, operation_id: &str) -> Result<Option<OperationStatus>> {
        let url = self.route(&[&self.config.status_route, operation_id]);
        debug!(url = %url, "polling operation status");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Routine outcome: the engine does not know this operation.
            return Ok(None);
        }
        if status.is_success() {
            let body: OperationStatus = response.json().await?;
            return Ok(Some(body));
        }

        Err(Error::Transport {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}
