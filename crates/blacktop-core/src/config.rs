//! Host configuration for the console.
//!
//! Loaded from a TOML file with environment overrides. The sandbox limits
//! (`max_memory_bytes`, `max_execution_ms`) are advisory: they travel on the
//! configuration for hosts to consult but are not enforced as a hard
//! isolation boundary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::constants;
use crate::kernel::error::{Error, Result};

/// Environment variable overriding the plugin directory
pub const PLUGIN_DIRECTORY_ENV: &str = "PLUGIN_DIRECTORY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory installed plugin packages live in
    pub plugin_dir: PathBuf,
    /// Directory fetched component bundles are cached in
    pub bundle_dir: PathBuf,
    /// Base directory for the key/value store
    pub data_dir: PathBuf,
    /// Substrings identifying trusted install sources. A source matching none
    /// of these is logged, not blocked.
    pub trusted_sources: Vec<String>,
    /// Per-topic message history capacity
    pub history_capacity: usize,
    /// Advisory per-plugin memory ceiling
    pub max_memory_bytes: Option<u64>,
    /// Advisory per-hook execution ceiling
    pub max_execution_ms: Option<u64>,
    /// HTTP bind address for the API server
    pub bind_addr: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from(constants::DEFAULT_PLUGINS_DIR),
            bundle_dir: PathBuf::from(constants::DEFAULT_BUNDLES_DIR),
            data_dir: PathBuf::from("data"),
            trusted_sources: Vec::new(),
            history_capacity: constants::DEFAULT_HISTORY_CAPACITY,
            max_memory_bytes: None,
            max_execution_ms: None,
            bind_addr: "127.0.0.1:4000".to_string(),
        }
    }
}

impl HostConfig {
    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: HostConfig = toml::from_str(raw).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
        })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when the path is
    /// absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(PLUGIN_DIRECTORY_ENV) {
            if !dir.is_empty() {
                self.plugin_dir = PathBuf::from(dir);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::Config {
                message: "history_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Whether an install source matches the trusted allow-list. An empty
    /// allow-list trusts everything.
    pub fn is_trusted_source(&self, source: &str) -> bool {
        if self.trusted_sources.is_empty() {
            return true;
        }
        self.trusted_sources.iter().any(|t| source.contains(t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = HostConfig::default();
        assert_eq!(config.history_capacity, 100);
        assert!(config.is_trusted_source("anything"));
    }

    #[test]
    fn toml_round_trip_and_validation() {
        let config = HostConfig::from_toml_str(
            r#"
            plugin_dir = "/var/lib/blacktop/plugins"
            trusted_sources = ["registry.blacktop"]
            history_capacity = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("/var/lib/blacktop/plugins"));
        assert!(config.is_trusted_source("https://registry.blacktop/weather"));
        assert!(!config.is_trusted_source("https://evil.example/pkg"));

        let err = HostConfig::from_toml_str("history_capacity = 0").unwrap_err();
        assert!(err.to_string().contains("history_capacity"));
    }
}
