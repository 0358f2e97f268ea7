//! Licensing registry client
//!
//! Posts a predicate to the registry's view query endpoint and returns the
//! raw records. Pagination is driven by the caller; the client neither
//! aggregates pages nor retries.
//!
//! Request body:
//! ```json
//! {"query": "SELECT * WHERE zip = '80516'", "page": {"pageNumber": 1, "pageSize": 1000}, "includeSynthetic": false}
//! ```

use super::{throttle, Throttle, USER_AGENT};
use crate::models::RegistryRecord;
use crate::query::Predicate;
use crate::settings::SyncSettings;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Registry client errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Registry returned {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One page of a registry query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page number
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn first(page_size: u32) -> Self {
        Self {
            page_number: 1,
            page_size,
        }
    }
}

/// Source of registry candidates
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_page(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> Result<Vec<RegistryRecord>, RegistryError>;

    /// First page of results
    async fn fetch(
        &self,
        predicate: &Predicate,
        page_size: u32,
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        self.fetch_page(predicate, PageRequest::first(page_size)).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    query: String,
    page: PageRequest,
    include_synthetic: bool,
}

/// HTTP client for the registry query endpoint
pub struct RegistryClient {
    http_client: reqwest::Client,
    endpoint: String,
    app_token: Option<String>,
    throttle: Arc<Throttle>,
}

impl RegistryClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, RegistryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: settings.registry_endpoint.clone(),
            app_token: settings.registry_app_token.clone(),
            throttle: throttle(settings.requests_per_second),
        })
    }
}

#[async_trait]
impl RegistrySource for RegistryClient {
    async fn fetch_page(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        self.throttle.until_ready().await;

        let body = QueryBody {
            query: predicate.to_string(),
            page,
            include_synthetic: false,
        };

        debug!(
            query = %body.query,
            page_number = page.page_number,
            page_size = page.page_size,
            "Querying licensing registry"
        );

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RegistryError::Api(status.as_u16(), error_text));
        }

        let records: Vec<RegistryRecord> = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(e.to_string()))?;

        debug!(count = records.len(), "Registry query complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_body_shape() {
        let body = QueryBody {
            query: "SELECT *".to_string(),
            page: PageRequest::first(20),
            include_synthetic: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "SELECT *",
                "page": {"pageNumber": 1, "pageSize": 20},
                "includeSynthetic": false
            })
        );
    }
}
