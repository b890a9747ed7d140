//! USAspending API client and response models
//!
//! Only the fields the reports need are modelled. Everything else in the API
//! responses is ignored on deserialization.

mod agencies;
mod client;
mod states;

pub use client::{ApiError, UsaSpendingClient, DEFAULT_BASE_URL};

use serde::{Deserialize, Serialize};

/// Award type string used by the API for loans
pub const AWARD_TYPE_LOANS: &str = "loans";

/// Award type string used by the API for grants
pub const AWARD_TYPE_GRANTS: &str = "grants";

/// A state or territory as listed by `/api/v2/recipient/state/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    /// Two-digit FIPS code, as a string (e.g. "06")
    pub fips: String,
    /// Human-readable state name
    pub name: String,
}

/// Profile of a single state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateProfile {
    /// Human-readable state name
    pub name: String,
    /// Resident population, when the API knows it
    #[serde(default)]
    pub population: Option<u64>,
}

/// Total obligated amount for one award type in a state and fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardSummary {
    /// Award type, e.g. "loans", "grants", "contracts"
    #[serde(rename = "type")]
    pub award_type: String,
    /// Amount in dollars
    #[serde(default)]
    pub amount: f64,
}

impl AwardSummary {
    /// Returns whether this summary is of the given award type
    pub fn is(&self, award_type: &str) -> bool {
        self.award_type == award_type
    }
}
