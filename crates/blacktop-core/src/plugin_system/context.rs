use std::fmt;

use serde_json::Value;

use crate::messaging::error::MessagingResult;
use crate::messaging::message::Message;
use crate::messaging::service::MessagingService;
use crate::storage::manager::StorageManager;

/// Logger scoped to a single plugin; every line carries the plugin id.
#[derive(Clone)]
pub struct PluginLogger {
    prefix: String,
}

impl PluginLogger {
    fn new(plugin_id: &str) -> Self {
        Self {
            prefix: format!("[{}]", plugin_id),
        }
    }

    pub fn debug(&self, message: &str) {
        log::debug!("{} {}", self.prefix, message);
    }

    pub fn info(&self, message: &str) {
        log::info!("{} {}", self.prefix, message);
    }

    pub fn warn(&self, message: &str) {
        log::warn!("{} {}", self.prefix, message);
    }

    pub fn error(&self, message: &str) {
        log::error!("{} {}", self.prefix, message);
    }
}

impl fmt::Debug for PluginLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLogger")
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Per-plugin capability bundle handed to `Plugin::initialize`.
///
/// Created at load time, one-to-one with the loaded instance, discarded at
/// unload. The emitter publishes on a topic namespace private to the plugin
/// (`plugin.<id>.<event>`).
#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin_id: String,
    messaging: MessagingService,
    storage: StorageManager,
    logger: PluginLogger,
}

impl PluginContext {
    pub fn new(plugin_id: &str, messaging: MessagingService, storage: StorageManager) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            messaging,
            storage,
            logger: PluginLogger::new(plugin_id),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Shared bus handle for subscribing and publishing.
    pub fn messaging(&self) -> &MessagingService {
        &self.messaging
    }

    /// Shared durable key/value storage.
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Plugin-scoped logger.
    pub fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    /// Topic inside this plugin's private event namespace.
    pub fn event_topic(&self, event: &str) -> String {
        format!("plugin.{}.{}", self.plugin_id, event)
    }

    /// Emit an event on the plugin's private namespace.
    pub async fn emit(&self, event: &str, payload: Value) -> MessagingResult<Message> {
        self.messaging.publish(&self.event_topic(event), payload).await
    }
}
