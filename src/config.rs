//! Configuration loading
//!
//! Settings come from an optional TOML file, overridden by command-line flags:
//!
//! ```toml
//! base_url = "https://api.usaspending.gov"
//! cache_file = "/var/cache/usaspend/cache.json"
//! strict_cache = false
//! ```

use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::StorePolicy;
use crate::data::DEFAULT_BASE_URL;

/// Name of the cache document inside the cache directory
const CACHE_FILE_NAME: &str = "cache.json";

/// Name of the config file inside the config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Could not read configuration file at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML or has unexpected fields
    #[error("Could not parse configuration file at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration, every field optional
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    cache_file: Option<PathBuf>,
    strict_cache: Option<bool>,
}

impl ConfigFile {
    fn parse(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(buf) => toml::from_str(&buf).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the USAspending API
    pub base_url: String,
    /// Location of the cache document
    pub cache_file: PathBuf,
    /// Fail instead of starting empty when the cache document is malformed
    pub strict_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_file: default_cache_file(),
            strict_cache: false,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default location
    ///
    /// A missing file at the default location is not an error; a missing
    /// file that was asked for explicitly is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ConfigFile::parse(path, true)?,
            None => match default_config_file() {
                Some(path) => ConfigFile::parse(&path, false)?,
                None => ConfigFile::default(),
            },
        };
        Ok(Self::default().merge(file))
    }

    /// Parses configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(Self::default().merge(file))
    }

    /// Applies command-line overrides
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        cache_file: Option<PathBuf>,
        strict_cache: Option<bool>,
    ) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(cache_file) = cache_file {
            self.cache_file = cache_file;
        }
        if let Some(strict_cache) = strict_cache {
            self.strict_cache = strict_cache;
        }
        self
    }

    /// Malformed-document policy for the memo cache
    pub fn store_policy(&self) -> StorePolicy {
        if self.strict_cache {
            StorePolicy::Strict
        } else {
            StorePolicy::Lenient
        }
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(cache_file) = file.cache_file {
            self.cache_file = cache_file;
        }
        if let Some(strict_cache) = file.strict_cache {
            self.strict_cache = strict_cache;
        }
        self
    }
}

/// Default cache document location
///
/// Uses `~/.cache/usaspend/cache.json` on Linux, or the equivalent XDG path on
/// other platforms. Falls back to `cache.json` in the working directory when no
/// home directory can be determined.
pub fn default_cache_file() -> PathBuf {
    ProjectDirs::from("", "", "usaspend")
        .map(|dirs| dirs.cache_dir().join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_FILE_NAME))
}

/// Default config file location, if a home directory exists
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "usaspend").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
