//! Transport for Hasura GraphQL requests.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use avo_core::logging::{DURATION_MS, OPERATION};
use avo_core::{Error, Result};

use crate::config::GraphQlConfig;

/// Requests slower than this are logged as slow.
const SLOW_REQUEST_MS: u64 = 5_000;

#[derive(Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Client for the Hasura GraphQL endpoint.
///
/// Implements the fragment, collection, label, management and item ports
/// from `avo_core` (see `repository.rs`).
pub struct HasuraClient {
    client: Client,
    config: GraphQlConfig,
}

impl HasuraClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GraphQlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(url = %config.url, "Initializing Hasura GraphQL client");

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GraphQlConfig::from_env())
    }

    pub fn config(&self) -> &GraphQlConfig {
        &self.config
    }

    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut req = self.client.post(&self.config.url);

        if let Some(ref secret) = self.config.admin_secret {
            req = req.header("x-hasura-admin-secret", secret);
        }
        if let Some(ref token) = self.config.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req.header("Content-Type", "application/json")
    }

    /// Run one GraphQL document and decode its `data` payload.
    ///
    /// `op` names the operation in errors and logs. A response carrying
    /// `errors` fails even when partial `data` is present.
    pub async fn execute<V, T>(&self, op: &'static str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let start = Instant::now();

        let response = self
            .build_request()
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| Error::Request(format!("{}: {}", op, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "{}: GraphQL endpoint returned {}: {}",
                op, status, body
            )));
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("{}: {}", op, e)))?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GraphQl(format!("{}: {}", op, messages.join("; "))));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!({ OPERATION } = op, { DURATION_MS } = elapsed, "GraphQL request complete");
        if elapsed > SLOW_REQUEST_MS {
            warn!({ OPERATION } = op, { DURATION_MS } = elapsed, slow = true, "Slow GraphQL request");
        }

        body.data
            .ok_or_else(|| Error::GraphQl(format!("{}: response has no data", op)))
    }
}
