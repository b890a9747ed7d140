//! Error types for the memoizing cache

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while deriving keys, hydrating, or persisting the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// An argument has no deterministic textual form
    #[error("Cannot encode argument for '{operation}': {reason}")]
    UnencodableArgument {
        /// Identifier of the operation being keyed
        operation: String,
        /// Why the argument was rejected
        reason: String,
    },

    /// The cache document exists but is not a JSON object
    #[error("Malformed cache document at {}: {source}", path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the cache document failed
    #[error("Failed to persist cache document at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A result could not be converted to or from its stored JSON form
    #[error("Cached entry '{key}' does not match the expected type: {source}")]
    EntryType {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn unencodable(operation: &str, reason: impl Into<String>) -> Self {
        CacheError::UnencodableArgument {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}
