//! REST proxy client: edit locks, contributors, and bulk fetch by id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use avo_core::logging::{COLLECTION_ID, OPERATION, SUBSYSTEM};
use avo_core::{
    Collection, Contributor, ContributorRepository, ContributorRight, EditLock, EditLockProvider,
    Error, Result,
};

use crate::config::ProxyConfig;

/// Body of a 409 response to an edit-lock request.
#[derive(Deserialize)]
struct LockConflict {
    #[serde(default)]
    holder_name: Option<String>,
    #[serde(default)]
    profile_id: Option<Uuid>,
}

/// Client for the AVO REST proxy.
pub struct ProxyClient {
    client: Client,
    config: ProxyConfig,
}

impl ProxyClient {
    /// Create a new proxy client with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(url = %config.base_url, "Initializing REST proxy client");

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ProxyConfig::from_env())
    }

    fn build_request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.request(method, url);

        if let Some(ref token) = self.config.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req
    }

    /// Map non-success statuses to errors; `op` names the call.
    async fn check(op: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Forbidden(format!("{}: {}", op, body))
            }
            StatusCode::NOT_FOUND => Error::NotFound(format!("{}: {}", op, body)),
            _ => Error::Request(format!("{}: proxy returned {}: {}", op, status, body)),
        })
    }

    async fn decode<T: DeserializeOwned>(
        op: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("{}: {}", op, e)))
    }

    /// Fetch several collections in one round trip. Unknown ids are omitted.
    #[instrument(skip(self, ids), fields({ SUBSYSTEM } = "proxy", { OPERATION } = "fetch_collections_by_ids", count = ids.len()))]
    pub async fn fetch_collections_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Collection>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .build_request(Method::POST, "/collections/fetch-by-ids")
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| Error::Request(format!("fetch_collections_by_ids: {}", e)))?;
        let response = Self::check("fetch_collections_by_ids", response).await?;
        let collections: Vec<Collection> =
            Self::decode("fetch_collections_by_ids", response).await?;

        debug!(returned = collections.len(), "Fetched collections by id");
        Ok(collections)
    }
}

#[async_trait]
impl EditLockProvider for ProxyClient {
    #[instrument(skip(self), fields({ SUBSYSTEM } = "proxy", { OPERATION } = "acquire_edit_lock", { COLLECTION_ID } = %collection_id))]
    async fn acquire_edit_lock(&self, collection_id: Uuid) -> Result<EditLock> {
        let response = self
            .build_request(
                Method::POST,
                &format!("/collections/{}/edit-lock", collection_id),
            )
            .send()
            .await
            .map_err(|e| Error::Request(format!("acquire_edit_lock: {}", e)))?;

        if response.status() == StatusCode::CONFLICT {
            let conflict: LockConflict = Self::decode("acquire_edit_lock", response).await?;
            let holder = conflict
                .holder_name
                .or_else(|| conflict.profile_id.map(|id| id.to_string()))
                .unwrap_or_else(|| "another user".to_string());
            return Err(Error::Locked {
                id: collection_id,
                holder,
            });
        }

        let response = Self::check("acquire_edit_lock", response).await?;
        Self::decode("acquire_edit_lock", response).await
    }

    #[instrument(skip(self), fields({ SUBSYSTEM } = "proxy", { OPERATION } = "release_edit_lock", { COLLECTION_ID } = %collection_id))]
    async fn release_edit_lock(&self, collection_id: Uuid) -> Result<()> {
        let response = self
            .build_request(
                Method::DELETE,
                &format!("/collections/{}/edit-lock", collection_id),
            )
            .send()
            .await
            .map_err(|e| Error::Request(format!("release_edit_lock: {}", e)))?;

        // Releasing a lock that already expired is not an error.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Edit lock already released");
            return Ok(());
        }
        Self::check("release_edit_lock", response).await?;
        Ok(())
    }
}

#[async_trait]
impl ContributorRepository for ProxyClient {
    async fn list_contributors(&self, collection_id: Uuid) -> Result<Vec<Contributor>> {
        let response = self
            .build_request(
                Method::GET,
                &format!("/collections/{}/contributors", collection_id),
            )
            .send()
            .await
            .map_err(|e| Error::Request(format!("list_contributors: {}", e)))?;
        let response = Self::check("list_contributors", response).await?;
        Self::decode("list_contributors", response).await
    }

    #[instrument(skip(self, email), fields({ SUBSYSTEM } = "proxy", { OPERATION } = "add_contributor", { COLLECTION_ID } = %collection_id))]
    async fn add_contributor(
        &self,
        collection_id: Uuid,
        email: &str,
        rights: ContributorRight,
    ) -> Result<()> {
        if rights == ContributorRight::Owner {
            return Err(Error::InvalidInput(
                "ownership is transferred, not shared".to_string(),
            ));
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(Error::InvalidInput(format!("not an e-mail address: {}", email)));
        }

        let response = self
            .build_request(
                Method::POST,
                &format!("/collections/{}/contributors", collection_id),
            )
            .json(&json!({ "email": email, "rights": rights }))
            .send()
            .await
            .map_err(|e| Error::Request(format!("add_contributor: {}", e)))?;
        Self::check("add_contributor", response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields({ SUBSYSTEM } = "proxy", { OPERATION } = "remove_contributor", { COLLECTION_ID } = %collection_id))]
    async fn remove_contributor(&self, collection_id: Uuid, contributor_id: Uuid) -> Result<()> {
        let response = self
            .build_request(
                Method::DELETE,
                &format!(
                    "/collections/{}/contributors/{}",
                    collection_id, contributor_id
                ),
            )
            .send()
            .await
            .map_err(|e| Error::Request(format!("remove_contributor: {}", e)))?;
        Self::check("remove_contributor", response).await?;
        Ok(())
    }
}
