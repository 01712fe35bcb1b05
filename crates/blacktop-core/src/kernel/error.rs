//! # Blacktop Core Kernel Errors
//!
//! Defines [`Error`], the aggregate error type for the console kernel.
//! Subsystem errors convert into it via `#[from]` so `?` works across
//! component boundaries.

use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::messaging::error::MessagingError;
use crate::module_store::error::ModuleStoreError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;

/// Top-level error type for the Blacktop console
#[derive(Debug, ThisError)]
pub enum Error {
    /// Typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Typed messaging error
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Typed storage error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Typed module store error
    #[error("Module store error: {0}")]
    ModuleStore(#[from] ModuleStoreError),

    /// Host configuration problem (missing file, bad TOML, invalid value)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase:?} for component '{}': {message}", component_name.as_deref().unwrap_or("<unknown>"))]
    Lifecycle {
        phase: LifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// A phase in the console's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Bootstrap,
    Initialize,
    Start,
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
