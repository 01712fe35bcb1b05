use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;

/// Capability a plugin requests from its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Database,
    Messaging,
    Storage,
    Network,
    Auth,
}

/// Core trait every backend plugin must implement.
///
/// Identity accessors must return non-empty values; the loader rejects an
/// instance whose first empty member it finds. The lifecycle hooks are called
/// by the plugin manager: `initialize` once at load with the plugin's
/// capability context, `destroy` once at unload, `enable`/`disable` while
/// loaded.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identifier, matching the package id
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Semantic version of the plugin
    fn version(&self) -> &str;

    /// Short description
    fn description(&self) -> &str;

    /// Author or vendor
    fn author(&self) -> &str;

    /// Ids of plugins this one depends on
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Capabilities this plugin requests
    fn permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Called once after loading, before any other hook.
    async fn initialize(&self, context: &PluginContext) -> Result<(), PluginSystemError>;

    /// Called once at unload. Bookkeeping is released whether or not this
    /// hook succeeds.
    async fn destroy(&self) -> Result<(), PluginSystemError>;

    /// Activate the plugin's functionality.
    async fn enable(&self) -> Result<(), PluginSystemError>;

    /// Deactivate the plugin's functionality without unloading it.
    async fn disable(&self) -> Result<(), PluginSystemError>;
}
