//! TOML configuration with built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub query: QueryConfig,
    pub postgres: PostgresConfig,
}

/// Result-cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry TTL in seconds (default: 300).
    pub ttl_secs: u64,
    /// Maximum cached result sets (default: 1000).
    pub max_entries: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row limit forced by preview runs.
    pub preview_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Connection pool size (default: 16).
    pub pool_size: usize,
    /// Statement timeout in milliseconds (default: 30000).
    pub statement_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 1000,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { preview_limit: 10 }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            statement_timeout_ms: 30_000,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load from `REPAST_CONFIG`, then `./repast.toml`, then defaults.
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("REPAST_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from REPAST_CONFIG");
                return cfg;
            }
        }
        if let Ok(cfg) = Self::from_file("repast.toml") {
            tracing::info!("loaded config from ./repast.toml");
            return cfg;
        }
        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}
