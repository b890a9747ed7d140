//! Command-line interface parsing for usaspend
//!
//! This module handles parsing of CLI arguments using clap, including fiscal
//! year validation and the default fiscal year for commands run without
//! `--year`.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use thiserror::Error;

/// Earliest fiscal year the API has data for
const FIRST_FISCAL_YEAR: i32 = 2001;

/// Latest fiscal year accepted on the command line
const LAST_FISCAL_YEAR: i32 = 2100;

/// Month in which a federal fiscal year starts (October)
const FISCAL_YEAR_START_MONTH: u32 = 10;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The fiscal year is not a number in the supported range
    #[error("Invalid fiscal year: '{0}'. Expected a year between 2001 and 2100")]
    InvalidYear(String),
}

/// usaspend - answer questions about federal spending from the USAspending API
///
/// API responses are cached in a local JSON document, so repeated questions
/// are answered without network calls.
#[derive(Parser, Debug)]
#[command(name = "usaspend")]
#[command(about = "Federal spending questions answered from the USAspending API")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the USAspending API
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Path of the cache document
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Fail instead of starting with an empty cache when the cache document is corrupt
    #[arg(long, global = true)]
    pub strict_cache: bool,

    /// Start with an empty cache when the cache document is corrupt, even if the config file asks for strict mode
    #[arg(long, global = true, conflicts_with = "strict_cache")]
    pub no_strict_cache: bool,

    /// Log cache hits, misses and requests to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Question to answer; runs the full report when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Questions the CLI can answer
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Average loan amount awarded to a state
    Loans {
        /// State name as listed by the API, e.g. "Texas"
        #[arg(long)]
        state: String,
        /// Fiscal year (defaults to the current one)
        #[arg(long, value_parser = parse_year_arg)]
        year: Option<i32>,
    },
    /// State with the highest grant value per resident
    Grants {
        /// Fiscal year (defaults to the current one)
        #[arg(long, value_parser = parse_year_arg)]
        year: Option<i32>,
    },
    /// Budgetary resources versus new awards for an agency
    Budget {
        /// Agency abbreviation, e.g. "NASA"
        #[arg(long)]
        agency: String,
        /// Fiscal year (defaults to the current one)
        #[arg(long, value_parser = parse_year_arg)]
        year: Option<i32>,
    },
    /// Answer the standard questions: Texas loans FY2019, grants FY2023, NASA FY2024
    Report,
    /// Inspect or clear the cache document
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show the cache document path and entry count
    Stats,
    /// Delete the cache document
    Clear,
}

impl Cli {
    /// Strict-cache setting from the command line, if one was given
    pub fn strict_cache_override(&self) -> Option<bool> {
        if self.strict_cache {
            Some(true)
        } else if self.no_strict_cache {
            Some(false)
        } else {
            None
        }
    }
}

/// Parses a fiscal year argument
///
/// # Returns
/// * `Ok(year)` for a number between 2001 and 2100
/// * `Err(CliError::InvalidYear)` otherwise
pub fn parse_year_arg(s: &str) -> Result<i32, CliError> {
    s.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| (FIRST_FISCAL_YEAR..=LAST_FISCAL_YEAR).contains(year))
        .ok_or_else(|| CliError::InvalidYear(s.to_string()))
}

/// Federal fiscal year containing `date`
///
/// A fiscal year starts on October 1 and is named after the calendar year in
/// which it ends.
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= FISCAL_YEAR_START_MONTH {
        date.year() + 1
    } else {
        date.year()
    }
}
