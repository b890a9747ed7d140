//! Application state and command execution
//!
//! Ties the configuration, the shared memo cache and the API client together,
//! and renders each command's answer as text.

use std::fmt::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::cache::{CacheError, MemoCache};
use crate::cli::{fiscal_year, CacheAction, Command};
use crate::config::Config;
use crate::data::{ApiError, UsaSpendingClient};
use crate::report;

/// State whose loans the standard report averages
const REPORT_LOAN_STATE: &str = "Texas";
/// Fiscal year of the standard loan question
const REPORT_LOAN_YEAR: i32 = 2019;
/// Fiscal year of the standard grant question
const REPORT_GRANT_YEAR: i32 = 2023;
/// Agency of the standard budget question
const REPORT_AGENCY: &str = "NASA";
/// Fiscal year of the standard budget question
const REPORT_BUDGET_YEAR: i32 = 2024;

/// Errors that can occur while running a command
#[derive(Debug, Error)]
pub enum AppError {
    /// An API lookup failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The cache document could not be inspected or removed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Main application state
pub struct App {
    /// Shared memo cache, also used by the client
    cache: Arc<MemoCache>,
    /// USAspending API client
    client: UsaSpendingClient,
    /// Date used to pick the default fiscal year
    today: NaiveDate,
}

impl App {
    /// Creates an App from resolved configuration
    pub fn new(config: &Config, today: NaiveDate) -> Self {
        let cache = Arc::new(MemoCache::open(&config.cache_file).with_policy(config.store_policy()));
        let client = UsaSpendingClient::new(config.base_url.clone(), Arc::clone(&cache));
        Self {
            cache,
            client,
            today,
        }
    }

    /// Runs `command` and returns the text to print
    pub async fn execute(&self, command: Command) -> Result<String, AppError> {
        let default_year = fiscal_year(self.today);

        match command {
            Command::Loans { state, year } => {
                self.loans(&state, year.unwrap_or(default_year)).await
            }
            Command::Grants { year } => self.grants(year.unwrap_or(default_year)).await,
            Command::Budget { agency, year } => {
                self.budget(&agency, year.unwrap_or(default_year)).await
            }
            Command::Report => self.report().await,
            Command::Cache { action } => self.cache_action(action),
        }
    }

    async fn loans(&self, state: &str, year: i32) -> Result<String, AppError> {
        let average = report::average_loan_amount_for_state(&self.client, state, year).await?;
        Ok(format!(
            "The average loan amount to {} in FY {} was: {:.2}",
            state, year, average
        ))
    }

    async fn grants(&self, year: i32) -> Result<String, AppError> {
        let answer = match report::highest_grant_state(&self.client, year).await? {
            Some(best) => format!(
                "{} state had the highest grant value per resident in the US in {} ({:.2} per resident)",
                best.name, year, best.per_resident
            ),
            None => format!("No state received grants in FY {}", year),
        };
        Ok(answer)
    }

    async fn budget(&self, agency: &str, year: i32) -> Result<String, AppError> {
        let budget = report::agency_budget(&self.client, agency, year).await?;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "The total budget resources available for {} in FY {} is: {:.2}",
            agency, year, budget.total_budgetary_resources
        );
        let _ = write!(
            out,
            "The new awards distribution ratio for {} in FY {} is: {}",
            agency, year, budget.new_award_count
        );
        if let Some(ratio) = budget.ratio() {
            let _ = write!(out, "\nBudget resources per new award: {:.2}", ratio);
        }
        Ok(out)
    }

    async fn report(&self) -> Result<String, AppError> {
        let sections = [
            self.loans(REPORT_LOAN_STATE, REPORT_LOAN_YEAR).await?,
            self.grants(REPORT_GRANT_YEAR).await?,
            self.budget(REPORT_AGENCY, REPORT_BUDGET_YEAR).await?,
        ];
        Ok(sections.join("\n"))
    }

    fn cache_action(&self, action: CacheAction) -> Result<String, AppError> {
        let path = self.cache.store().path().display().to_string();
        match action {
            CacheAction::Stats => Ok(format!(
                "Cache document: {}\nEntries: {}",
                path,
                self.cache.len()?
            )),
            CacheAction::Clear => {
                if self.cache.store().clear()? {
                    Ok(format!("Removed cache document {}", path))
                } else {
                    Ok(format!("No cache document at {}", path))
                }
            }
        }
    }
}
