//! usaspend library
//!
//! This module exposes the memoizing cache, the API client, the reports and
//! the CLI pieces for use by the binary and integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod report;
