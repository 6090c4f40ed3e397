//! Configuration loading and management
//!
//! Handles parsing of `todolist.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::seed::DEFAULT_SEED_URL;

/// Conventional configuration file name
pub const CONFIG_FILE: &str = "todolist.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Remote seed configuration
    #[serde(default)]
    pub seed: SeedConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Task store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How long a writer waits for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Configured data directory, or the platform default
    pub fn resolved_path(&self) -> crate::error::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => crate::storage::default_data_dir(),
        }
    }
}

/// Remote seed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Seed an empty store on first load
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Endpoint returning `{ "todos": [...] }`
    #[serde(default = "default_seed_url")]
    pub url: String,

    /// Request timeout; unset leaves the HTTP client default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_seed_url() -> String {
    DEFAULT_SEED_URL.to_string()
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_seed_url(),
            timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "ignoring invalid configuration"
                    );
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.store.validate()?;
        self.seed.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "store.path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl SeedConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "seed.url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "seed.url '{url}' must be an http(s) URL"
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(crate::error::Error::InvalidConfig(
                "seed.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl LogConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if let Some(filter) = &self.filter {
            tracing_subscriber::EnvFilter::try_new(filter).map_err(|err| {
                crate::error::Error::InvalidConfig(format!(
                    "log.filter '{filter}' is invalid: {err}"
                ))
            })?;
        }
        Ok(())
    }
}
