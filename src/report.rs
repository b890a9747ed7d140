//! Aggregations answering the spending questions
//!
//! The pure functions work on already-fetched data; the async ones combine
//! them with [`UsaSpendingClient`] lookups.

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::data::{
    ApiError, AwardSummary, StateSummary, UsaSpendingClient, AWARD_TYPE_GRANTS, AWARD_TYPE_LOANS,
};

/// Maximum number of states fetched at the same time
const MAX_CONCURRENT_STATES: usize = 8;

/// Grant value per resident for one state
#[derive(Debug, Clone, PartialEq)]
pub struct StateGrant {
    /// State name
    pub name: String,
    /// Total grant dollars divided by population
    pub per_resident: f64,
}

/// Budget figures for an agency in one fiscal year
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyBudget {
    /// Top tier code of the agency
    pub toptier_code: String,
    /// Total budgetary resources in dollars
    pub total_budgetary_resources: f64,
    /// Number of new awards made
    pub new_award_count: u64,
}

impl AgencyBudget {
    /// Budgetary resources per new award, `None` when no awards were made
    pub fn ratio(&self) -> Option<f64> {
        if self.new_award_count == 0 {
            None
        } else {
            Some(self.total_budgetary_resources / self.new_award_count as f64)
        }
    }
}

/// Mean amount of the loan entries, `0.0` when there are none
pub fn average_loan_amount(awards: &[AwardSummary]) -> f64 {
    let (total, count) = awards
        .iter()
        .filter(|award| award.is(AWARD_TYPE_LOANS))
        .fold((0.0, 0usize), |(total, count), award| {
            (total + award.amount, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Total grant amount divided by population, `0.0` for an unknown or zero population
pub fn grant_value_per_resident(awards: &[AwardSummary], population: u64) -> f64 {
    if population == 0 {
        return 0.0;
    }

    let total: f64 = awards
        .iter()
        .filter(|award| award.is(AWARD_TYPE_GRANTS))
        .map(|award| award.amount)
        .sum();

    total / population as f64
}

/// Picks the state with the strictly highest positive ratio
///
/// Ties keep the earlier state. Returns `None` if no ratio is above zero.
pub fn highest_ratio(ratios: impl IntoIterator<Item = StateGrant>) -> Option<StateGrant> {
    ratios.into_iter().fold(None, |best, candidate| {
        let current = best.as_ref().map_or(0.0, |b: &StateGrant| b.per_resident);
        if candidate.per_resident > current {
            Some(candidate)
        } else {
            best
        }
    })
}

/// Average loan amount awarded to the named state in a fiscal year
pub async fn average_loan_amount_for_state(
    client: &UsaSpendingClient,
    state_name: &str,
    year: i32,
) -> Result<f64, ApiError> {
    let fips = client.fips_code(state_name).await?;
    let awards = client.awards(&fips, year).await?;
    Ok(average_loan_amount(&awards))
}

/// State with the highest grant value per resident in a fiscal year
pub async fn highest_grant_state(
    client: &UsaSpendingClient,
    year: i32,
) -> Result<Option<StateGrant>, ApiError> {
    let states = client.states().await?;
    tracing::debug!(states = states.len(), year, "Computing grant value per resident");

    let ratios: Vec<StateGrant> = stream::iter(states)
        .map(|state: StateSummary| async move {
            let awards = client.awards(&state.fips, year).await?;
            let population = client.state(&state.fips).await?.population.unwrap_or(0);
            Ok::<_, ApiError>(StateGrant {
                per_resident: grant_value_per_resident(&awards, population),
                name: state.name,
            })
        })
        .buffered(MAX_CONCURRENT_STATES)
        .try_collect()
        .await?;

    Ok(highest_ratio(ratios))
}

/// Budgetary resources and new award count for an agency in a fiscal year
pub async fn agency_budget(
    client: &UsaSpendingClient,
    abbreviation: &str,
    year: i32,
) -> Result<AgencyBudget, ApiError> {
    let toptier_code = client.toptier_code(abbreviation).await?;
    let total_budgetary_resources = client.budgetary_resources(&toptier_code, year).await?;
    let new_award_count = client.new_award_count(&toptier_code, year).await?;

    Ok(AgencyBudget {
        toptier_code,
        total_budgetary_resources,
        new_award_count,
    })
}
