//! State recipient endpoints

use crate::cache::wrap;

use super::{ApiError, AwardSummary, StateProfile, StateSummary, UsaSpendingClient};

impl UsaSpendingClient {
    /// Lists every state and territory with its FIPS code
    ///
    /// Not memoized: the list is small and every report starts from it.
    pub async fn states(&self) -> Result<Vec<StateSummary>, ApiError> {
        self.get_request::<Vec<StateSummary>>("/api/v2/recipient/state/")
            .await
    }

    /// Fetches the profile of the state with the given FIPS code
    pub async fn state(&self, fips: &str) -> Result<StateProfile, ApiError> {
        wrap("get_state_data", &self.cache, |(fips,): (String,)| async move {
            self.get_request::<StateProfile>(&format!("/api/v2/recipient/state/{}", fips))
                .await
        })
        .call_async((fips.to_string(),))
        .await
    }

    /// Fetches award totals by type for a state in a fiscal year
    pub async fn awards(&self, fips: &str, year: i32) -> Result<Vec<AwardSummary>, ApiError> {
        wrap(
            "get_awards_data",
            &self.cache,
            |(fips, year): (String, i32)| async move {
                self.get_request::<Vec<AwardSummary>>(&format!(
                    "/api/v2/recipient/state/awards/{}/?fiscal_year={}",
                    fips, year
                ))
                .await
            },
        )
        .call_async((fips.to_string(), year))
        .await
    }

    /// Resolves a state name (e.g. "Texas") to its FIPS code
    ///
    /// # Errors
    /// * `ApiError::UnknownState` if no listed state has that exact name
    pub async fn fips_code(&self, state_name: &str) -> Result<String, ApiError> {
        let states = self.states().await?;
        find_fips(&states, state_name).ok_or_else(|| ApiError::UnknownState(state_name.to_string()))
    }
}

/// Finds the FIPS code of the state named exactly `state_name`
fn find_fips(states: &[StateSummary], state_name: &str) -> Option<String> {
    states
        .iter()
        .find(|state| state.name == state_name)
        .map(|state| state.fips.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, MemoCache};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Client pointed at a port nobody listens on, so only cache hits succeed
    fn create_offline_client() -> (UsaSpendingClient, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = Arc::new(MemoCache::open(temp_dir.path().join("cache.json")));
        (UsaSpendingClient::new("http://127.0.0.1:9", cache), temp_dir)
    }

    fn sample_states() -> Vec<StateSummary> {
        vec![
            StateSummary {
                fips: "06".to_string(),
                name: "California".to_string(),
            },
            StateSummary {
                fips: "48".to_string(),
                name: "Texas".to_string(),
            },
        ]
    }

    #[test]
    fn test_find_fips_exact_match() {
        assert_eq!(find_fips(&sample_states(), "Texas"), Some("48".to_string()));
        assert_eq!(find_fips(&sample_states(), "California"), Some("06".to_string()));
    }

    #[test]
    fn test_find_fips_is_case_sensitive() {
        assert_eq!(find_fips(&sample_states(), "texas"), None);
        assert_eq!(find_fips(&sample_states(), "Atlantis"), None);
    }

    #[tokio::test]
    async fn test_state_returns_cached_without_request() {
        let (client, _temp_dir) = create_offline_client();
        let key = CacheKey::for_args("get_state_data", &("48",)).unwrap();
        client
            .cache()
            .insert(key, json!({"name": "Texas", "population": 29000000}))
            .unwrap();

        let profile = client.state("48").await.unwrap();

        assert_eq!(profile.name, "Texas");
        assert_eq!(profile.population, Some(29000000));
    }

    #[tokio::test]
    async fn test_awards_returns_cached_without_request() {
        let (client, _temp_dir) = create_offline_client();
        let key = CacheKey::for_args("get_awards_data", &("48", 2019)).unwrap();
        client
            .cache()
            .insert(
                key,
                json!([{"type": "loans", "amount": 100.0}, {"type": "grants", "amount": 5.0}]),
            )
            .unwrap();

        let awards = client.awards("48", 2019).await.unwrap();

        assert_eq!(awards.len(), 2);
        assert!(awards[0].is("loans"));
    }

    #[tokio::test]
    async fn test_failed_request_is_not_cached() {
        let (client, _temp_dir) = create_offline_client();

        let result = client.state("06").await;

        assert!(matches!(result, Err(ApiError::RequestFailed(_))));
        assert!(client.cache().is_empty().unwrap());
    }
}
