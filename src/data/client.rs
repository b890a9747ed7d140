//! HTTP client for the USAspending v2 API

use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::cache::{CacheError, MemoCache};

/// Base URL of the public USAspending API
pub const DEFAULT_BASE_URL: &str = "https://api.usaspending.gov";

/// Errors that can occur when querying the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed or returned a non-success status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// No state with the given name is listed by the API
    #[error("No FIPS code found for state: {0}")]
    UnknownState(String),

    /// No top tier agency with the given abbreviation is listed by the API
    #[error("No top tier agency found for abbreviation: {0}")]
    UnknownAgency(String),

    /// The result cache could not be read or written
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Client for the USAspending API
///
/// Idempotent lookups are memoized in the shared [`MemoCache`]; listing
/// endpoints that feed several lookups are always fetched fresh.
#[derive(Debug, Clone)]
pub struct UsaSpendingClient {
    /// HTTP client for making requests
    pub(super) http_client: Client,
    /// Base URL for the API (allows override for testing)
    pub(super) base_url: String,
    /// Shared memo cache for API results
    pub(super) cache: Arc<MemoCache>,
}

impl UsaSpendingClient {
    /// Creates a client for `base_url` that memoizes into `cache`
    pub fn new(base_url: impl Into<String>, cache: Arc<MemoCache>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
            cache,
        }
    }

    /// Returns the shared memo cache
    pub fn cache(&self) -> &Arc<MemoCache> {
        &self.cache
    }

    /// GETs `endpoint` relative to the base URL and decodes the JSON body
    ///
    /// # Errors
    /// * `ApiError::RequestFailed` on connection failure, non-2xx status, or
    ///   a body that does not decode into `T`
    pub async fn get_request<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);
        tracing::debug!(%url, "GET");

        let data = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_error_messages() {
        let err = ApiError::UnknownState("Atlantis".to_string());
        assert_eq!(err.to_string(), "No FIPS code found for state: Atlantis");

        let err = ApiError::UnknownAgency("XYZ".to_string());
        assert!(err.to_string().contains("XYZ"));
    }

    #[tokio::test]
    async fn test_get_request_reports_connection_failure() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(MemoCache::open(temp_dir.path().join("cache.json")));
        // Nothing listens on the discard port
        let client = UsaSpendingClient::new("http://127.0.0.1:9", cache);

        let result: Result<serde_json::Value, ApiError> =
            client.get_request("/api/v2/recipient/state/").await;

        assert!(matches!(result, Err(ApiError::RequestFailed(_))));
    }
}
