//! HTTP client for the twin-store REST API.
//!
//! Wraps the two calls the relay needs: fetch a twin document and apply a
//! JSON Patch list to it. Authentication bootstrap (token acquisition) is
//! external; the client only attaches a bearer token when given one.

use crate::encoding::encode_twin_id;
use crate::store::{TwinStore, TwinStoreError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use twin_relay_core::PatchOperation;

/// Twin-store client configuration.
#[derive(Debug, Clone)]
pub struct AdtClientConfig {
    /// Base URL of the twin-store service (e.g. <https://myadt.api.weu.digitaltwins.azure.net>)
    pub base_url: String,
    /// API version passed on every call
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional bearer token for authentication
    pub bearer_token: Option<String>,
}

impl Default for AdtClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_version: "2023-10-31".to_string(),
            timeout: Duration::from_secs(30),
            bearer_token: None,
        }
    }
}

impl AdtClientConfig {
    /// Config pointing at a service endpoint, with defaults elsewhere.
    #[must_use]
    pub fn for_endpoint(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// HTTP client implementing [`TwinStore`] against the real store.
pub struct AdtClient {
    client: Client,
    config: AdtClientConfig,
}

impl AdtClient {
    /// Create a new twin-store client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: AdtClientConfig) -> Result<Self, TwinStoreError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if config.base_url.starts_with("https://") {
            builder = builder.use_rustls_tls();
        }

        let client = builder
            .build()
            .map_err(|e| TwinStoreError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn twin_url(&self, twin_id: &str) -> String {
        format!(
            "{}/digitaltwins/{}?api-version={}",
            self.config.base_url.trim_end_matches('/'),
            encode_twin_id(twin_id),
            self.config.api_version
        )
    }

    fn auth_header(&self) -> Option<String> {
        self.config
            .bearer_token
            .as_ref()
            .map(|t| format!("Bearer {t}"))
    }
}

#[async_trait]
impl TwinStore for AdtClient {
    async fn get_twin(&self, twin_id: &str) -> Result<Value, TwinStoreError> {
        let url = self.twin_url(twin_id);

        tracing::debug!(twin_id, url, "GET twin");

        let mut request = self.client.get(&url);
        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TwinStoreError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TwinStoreError::NotFound(twin_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(TwinStoreError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| TwinStoreError::Parse(e.to_string()))
    }

    async fn apply_patch(
        &self,
        twin_id: &str,
        ops: &[PatchOperation],
    ) -> Result<(), TwinStoreError> {
        let url = self.twin_url(twin_id);

        tracing::debug!(twin_id, url, op_count = ops.len(), "PATCH twin");

        let mut request = self
            .client
            .patch(&url)
            .header("Content-Type", "application/json-patch+json")
            .json(ops);

        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TwinStoreError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TwinStoreError::NotFound(twin_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(TwinStoreError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let config = AdtClientConfig::default();
        assert!(config.base_url.is_empty());
        assert_eq!(config.api_version, "2023-10-31");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn client_creation() {
        let config = AdtClientConfig::for_endpoint("https://twins.example.net");
        assert!(AdtClient::new(config).is_ok());
    }

    #[test]
    fn twin_url_encodes_id_and_version() {
        let client =
            AdtClient::new(AdtClientConfig::for_endpoint("https://twins.example.net/")).unwrap();
        assert_eq!(
            client.twin_url("plant a"),
            "https://twins.example.net/digitaltwins/plant%20a?api-version=2023-10-31"
        );
    }
}
