//! Remote catalog access.
//!
//! The store only sees [`CatalogSource`]; the HTTP client is one
//! implementation and tests inject scripted ones.

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::model::{Category, ListPayload, RawProduct};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const PRODUCTS_RESOURCE: &str = "products";
pub const CATEGORIES_RESOURCE: &str = "categories";

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<RawProduct>, CatalogError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError>;
}

/// JSON-over-HTTP catalog backend.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    products_url: String,
    categories_url: String,
    client: reqwest::Client,
}

impl HttpCatalogSource {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &CatalogConfig, client: reqwest::Client) -> Self {
        Self {
            products_url: join_url(&config.api_base_url, &config.products_path),
            categories_url: join_url(&config.api_base_url, &config.categories_path),
            client,
        }
    }

    pub fn products_url(&self) -> &str {
        &self.products_url
    }

    pub fn categories_url(&self) -> &str {
        &self.categories_url
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        url: &str,
    ) -> Result<Vec<T>, CatalogError> {
        debug!(resource, url, "fetching catalog resource");
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| CatalogError::transport(resource, error))?;

        if !resp.status().is_success() {
            return Err(CatalogError::Status {
                resource: resource.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|error| CatalogError::transport(resource, error))?;
        let payload: ListPayload<T> =
            serde_json::from_slice(&body).map_err(|error| CatalogError::decode(resource, error))?;
        Ok(payload.into_items())
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_products(&self) -> Result<Vec<RawProduct>, CatalogError> {
        self.get_list(PRODUCTS_RESOURCE, &self.products_url).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.get_list(CATEGORIES_RESOURCE, &self.categories_url).await
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
