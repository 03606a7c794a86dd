//! Reachability check for the remote catalog service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Path probed to decide whether a catalog service answers.
pub const CATALOG_TYPES_PATH: &str = "api/v1/catalog/catalogtypes";

#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Succeeds when the catalog service at `base_url` answers a catalog
    /// request with a success status.
    async fn probe(&self, base_url: &str) -> Result<()>;
}

/// HTTP client for the remote catalog web API.
pub struct WebApiClient {
    client: reqwest::Client,
}

impl WebApiClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub fn endpoint(base_url: &str, path: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), path)
    }

    pub async fn get(&self, base_url: &str, path: &str) -> Result<String> {
        let url = Self::endpoint(base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Request to {} failed with status: {}", url, response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))
    }
}

#[async_trait]
impl ServiceProbe for WebApiClient {
    async fn probe(&self, base_url: &str) -> Result<()> {
        self.get(base_url, CATALOG_TYPES_PATH).await.map(|_| ())
    }
}
