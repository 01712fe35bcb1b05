//! # Blacktop Plugin System Errors
//!
//! Defines [`PluginSystemError`], the error enum for plugin operations:
//! contract validation, dynamic loading, install/uninstall failures, and
//! lifecycle hook errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin '{plugin_id}' failed validation: missing or empty required member '{missing}'")]
    Validation { plugin_id: String, missing: String },

    #[error("Plugin '{plugin_id}' declares id '{declared}' but was resolved as '{plugin_id}'")]
    IdentityMismatch { plugin_id: String, declared: String },

    #[error("Plugin '{plugin_id}' is not loaded")]
    NotLoaded { plugin_id: String },

    #[error("Plugin '{plugin_id}' is already loaded")]
    AlreadyLoaded { plugin_id: String },

    #[error("Plugin '{plugin_id}' is not installed")]
    NotInstalled { plugin_id: String },

    #[error("Install failed for '{spec}': {message}")]
    Install {
        spec: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Plugin loading failed for '{plugin_id}' from '{}': {message}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".into()))]
    Loading {
        plugin_id: String,
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Plugin '{plugin_id}' targets API {declared}, host provides {host}")]
    ApiIncompatible {
        plugin_id: String,
        declared: String,
        host: String,
    },

    #[error("Plugin manifest error for '{}': {message}", path.display())]
    Manifest {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin initialization error for '{plugin_id}': {message}")]
    Initialization { plugin_id: String, message: String },

    #[error("Plugin shutdown error for '{plugin_id}': {message}")]
    Shutdown { plugin_id: String, message: String },

    #[error("Operation error in plugin '{plugin_id}': {message}")]
    Operation { plugin_id: String, message: String },

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] semver::Error),

    #[error("Internal plugin system error: {0}")]
    Internal(String),
}
