//! Weather feed plugin: answers `weather.query` requests on the bus with the
//! latest report while enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use blacktop_core::declare_plugin;
use blacktop_core::messaging::service::MessageHandler;
use blacktop_core::plugin_system::context::PluginContext;
use blacktop_core::plugin_system::error::PluginSystemError;
use blacktop_core::plugin_system::traits::{Permission, Plugin};

pub const QUERY_TOPIC: &str = "weather.query";

pub struct WeatherFeedPlugin {
    active: Arc<AtomicBool>,
}

impl WeatherFeedPlugin {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn boxed() -> Box<dyn Plugin> {
        Box::new(Self::new())
    }
}

impl Default for WeatherFeedPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for WeatherFeedPlugin {
    fn id(&self) -> &str {
        "weather-feed"
    }

    fn name(&self) -> &str {
        "Weather Feed"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Serves weather reports for the field map"
    }

    fn author(&self) -> &str {
        "Blacktop Developers"
    }

    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::Messaging, Permission::Network]
    }

    async fn initialize(&self, context: &PluginContext) -> Result<(), PluginSystemError> {
        let messaging = context.messaging().clone();
        let active = self.active.clone();
        let handler: MessageHandler = Arc::new(move |message| {
            let messaging = messaging.clone();
            let active = active.clone();
            let message = message.clone();
            Box::pin(async move {
                let report = if active.load(Ordering::SeqCst) {
                    json!({ "conditions": "clear", "visibility_km": 10 })
                } else {
                    json!({ "error": "weather feed is disabled" })
                };
                messaging.reply(&message, report).await
            })
        });
        context.messaging().subscribe(QUERY_TOPIC, handler).await;
        context.logger().info("subscribed to weather queries");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginSystemError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn enable(&self) -> Result<(), PluginSystemError> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disable(&self) -> Result<(), PluginSystemError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

declare_plugin!(WeatherFeedPlugin::boxed);

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tempfile::tempdir;

    use blacktop_core::MessagingService;
    use blacktop_core::StorageManager;

    use super::*;

    fn context_fixture() -> (PluginContext, MessagingService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let messaging = MessagingService::default();
        let storage = StorageManager::new(dir.path().to_path_buf());
        let context = PluginContext::new("weather-feed", messaging.clone(), storage);
        (context, messaging, dir)
    }

    #[tokio::test]
    async fn answers_queries_when_enabled() {
        let (context, messaging, _dir) = context_fixture();
        let plugin = WeatherFeedPlugin::new();
        plugin.initialize(&context).await.unwrap();
        plugin.enable().await.unwrap();

        let answer = messaging
            .request(QUERY_TOPIC, json!({}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(answer["conditions"], "clear");
    }

    #[tokio::test]
    async fn reports_disabled_when_inactive() {
        let (context, messaging, _dir) = context_fixture();
        let plugin = WeatherFeedPlugin::new();
        plugin.initialize(&context).await.unwrap();

        let answer = messaging
            .request(QUERY_TOPIC, json!({}), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(answer["error"].is_string());

        plugin.enable().await.unwrap();
        plugin.disable().await.unwrap();
        let answer = messaging
            .request(QUERY_TOPIC, json!({}), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(answer["error"].is_string());
    }
}
