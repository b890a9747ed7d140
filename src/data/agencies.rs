//! Agency endpoints: top tier codes, budgetary resources and new award counts

use serde::Deserialize;

use crate::cache::wrap;

use super::{ApiError, UsaSpendingClient};

/// Response from `/api/v2/references/toptier_agencies/`
#[derive(Debug, Deserialize)]
struct ToptierAgenciesResponse {
    results: Vec<ToptierAgency>,
}

#[derive(Debug, Deserialize)]
struct ToptierAgency {
    abbreviation: Option<String>,
    toptier_code: String,
}

/// Response from `/api/v2/agency/{code}/budgetary_resources/`
#[derive(Debug, Deserialize)]
struct BudgetaryResourcesResponse {
    agency_data_by_year: Vec<BudgetYear>,
}

#[derive(Debug, Deserialize)]
struct BudgetYear {
    fiscal_year: i32,
    total_budgetary_resources: Option<f64>,
}

/// Response from `/api/v2/agency/{code}/awards/new/count/`
#[derive(Debug, Deserialize)]
struct NewAwardCountResponse {
    new_award_count: u64,
}

impl UsaSpendingClient {
    /// Resolves an agency abbreviation (e.g. "NASA") to its top tier code
    ///
    /// # Errors
    /// * `ApiError::UnknownAgency` if no agency has that abbreviation. The
    ///   failure is not cached, so a later call asks the API again.
    pub async fn toptier_code(&self, abbreviation: &str) -> Result<String, ApiError> {
        wrap(
            "get_toptier_code",
            &self.cache,
            |(abbreviation,): (String,)| async move {
                let response = self
                    .get_request::<ToptierAgenciesResponse>("/api/v2/references/toptier_agencies/")
                    .await?;
                find_toptier_code(&response.results, &abbreviation)
                    .ok_or(ApiError::UnknownAgency(abbreviation))
            },
        )
        .call_async((abbreviation.to_string(),))
        .await
    }

    /// Total budgetary resources of an agency in a fiscal year
    ///
    /// Returns `0.0` when the API has no figure for that year.
    pub async fn budgetary_resources(&self, toptier_code: &str, year: i32) -> Result<f64, ApiError> {
        wrap(
            "get_budgetary_resources",
            &self.cache,
            |(code, year): (String, i32)| async move {
                let response = self
                    .get_request::<BudgetaryResourcesResponse>(&format!(
                        "/api/v2/agency/{}/budgetary_resources/",
                        code
                    ))
                    .await?;
                Ok::<_, ApiError>(resources_for_year(&response.agency_data_by_year, year))
            },
        )
        .call_async((toptier_code.to_string(), year))
        .await
    }

    /// Number of new awards an agency made in a fiscal year
    pub async fn new_award_count(&self, toptier_code: &str, year: i32) -> Result<u64, ApiError> {
        wrap(
            "get_new_awards_distribution_ratio",
            &self.cache,
            |(code, year): (String, i32)| async move {
                let response = self
                    .get_request::<NewAwardCountResponse>(&format!(
                        "/api/v2/agency/{}/awards/new/count/?fiscal_year={}",
                        code, year
                    ))
                    .await?;
                Ok::<_, ApiError>(response.new_award_count)
            },
        )
        .call_async((toptier_code.to_string(), year))
        .await
    }
}

fn find_toptier_code(agencies: &[ToptierAgency], abbreviation: &str) -> Option<String> {
    agencies
        .iter()
        .find(|agency| agency.abbreviation.as_deref() == Some(abbreviation))
        .map(|agency| agency.toptier_code.clone())
}

fn resources_for_year(rows: &[BudgetYear], year: i32) -> f64 {
    rows.iter()
        .find(|row| row.fiscal_year == year)
        .and_then(|row| row.total_budgetary_resources)
        .unwrap_or(0.0)
}
