//! # Settings
//!
//! Startup configuration, read from TOML. Every field has a default so an
//! empty file (or no file at all) yields a usable in-memory graph.
//!
//! ```toml
//! [store]
//! backend = "redb"          # "memory" | "redb"
//! path = "graph.redb"
//!
//! [graph]
//! refresh = "always"        # "always" | "cached"
//! compression = "external"  # "none" | "inline" | "external"
//!
//! [index]
//! namespace = "docgraph"
//! stale = false
//! retries = 5
//! retry_delay_ms = 1000
//! ```

use crate::compression::CompressionMode;
use crate::element::RefreshPolicy;
use crate::primitives::{DEFAULT_INDEX_NAMESPACE, INDEX_QUERY_RETRIES, INDEX_RETRY_DELAY_MS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which `DocumentStore` implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redb,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Database file, required by the redb backend.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphSettings {
    pub refresh: RefreshPolicy,
    pub compression: CompressionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSettings {
    /// Prefix shared by the graph's index names.
    pub namespace: String,
    /// Allow index queries to answer from the last snapshot.
    pub stale: bool,
    /// Attempts before a query against a missing index gives up.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_INDEX_NAMESPACE.to_string(),
            stale: false,
            retries: INDEX_QUERY_RETRIES,
            retry_delay_ms: INDEX_RETRY_DELAY_MS,
        }
    }
}

impl IndexSettings {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Complete graph configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub store: StoreSettings,
    pub graph: GraphSettings,
    pub index: IndexSettings,
}

impl Settings {
    /// Read and validate a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new("<inline>"))
    }

    /// Settings for a redb store at `path`, everything else default.
    #[must_use]
    pub fn redb(path: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreSettings {
                backend: StoreBackend::Redb,
                path: Some(path.into()),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Redb && self.store.path.is_none() {
            return Err(ConfigError::Invalid(
                "store.path is required for the redb backend".to_string(),
            ));
        }
        if self.index.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "index.namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }
}
