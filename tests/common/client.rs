//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per catalog-server endpoint.
//! When API routes change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    pub async fn get_catalog_types(&self) -> Response {
        self.get("/api/v1/catalog/catalogtypes").await
    }

    pub async fn get_catalog_brands(&self) -> Response {
        self.get("/api/v1/catalog/catalogbrands").await
    }

    /// Lists items; `None` parameters are left out of the query string.
    pub async fn get_items(
        &self,
        type_id: Option<i32>,
        brand_id: Option<i32>,
        query: Option<&str>,
    ) -> Response {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(type_id) = type_id {
            params.push(("typeId", type_id.to_string()));
        }
        if let Some(brand_id) = brand_id {
            params.push(("brandId", brand_id.to_string()));
        }
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.client
            .get(format!("{}/api/v1/catalog/items", self.base_url))
            .query(&params)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_item(&self, id: i32) -> Response {
        self.get(&format!("/api/v1/catalog/items/{}", id)).await
    }

    pub async fn get_item_picture(&self, id: i32) -> Response {
        self.get(&format!("/api/v1/catalog/items/{}/pic", id)).await
    }

    pub async fn get_metrics(&self) -> Response {
        self.get("/metrics").await
    }
}
