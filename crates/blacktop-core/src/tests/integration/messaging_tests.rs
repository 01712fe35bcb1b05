//! Cross-component messaging: plugins talking to each other over the bus
//! through their contexts, and request/response across components.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::tempdir;
use tokio::sync::Mutex;

use crate::config::HostConfig;
use crate::kernel::bootstrap::Console;
use crate::messaging::error::MessagingError;
use crate::messaging::message::Message;
use crate::messaging::service::MessageHandler;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;

/// Plugin that records every message it sees on its subscribed topic.
struct ListenerPlugin {
    received: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl Plugin for ListenerPlugin {
    fn id(&self) -> &str {
        "listener"
    }
    fn name(&self) -> &str {
        "Listener"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "records bus traffic"
    }
    fn author(&self) -> &str {
        "tests"
    }
    async fn initialize(&self, context: &PluginContext) -> Result<(), PluginSystemError> {
        let received = self.received.clone();
        let handler: MessageHandler = Arc::new(move |message| {
            let received = received.clone();
            let message = message.clone();
            Box::pin(async move {
                received.lock().await.push(message);
                Ok(())
            })
        });
        context.messaging().subscribe("field.reports", handler).await;
        Ok(())
    }
    async fn destroy(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn enable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn disable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
}

/// Plugin answering requests on its own namespace.
struct ResponderPlugin;

#[async_trait]
impl Plugin for ResponderPlugin {
    fn id(&self) -> &str {
        "responder"
    }
    fn name(&self) -> &str {
        "Responder"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "answers status requests"
    }
    fn author(&self) -> &str {
        "tests"
    }
    async fn initialize(&self, context: &PluginContext) -> Result<(), PluginSystemError> {
        let messaging = context.messaging().clone();
        let handler: MessageHandler = Arc::new(move |message| {
            let messaging = messaging.clone();
            let message = message.clone();
            Box::pin(async move {
                messaging.reply(&message, json!({ "status": "ready" })).await?;
                Ok(())
            })
        });
        context.messaging().subscribe("responder.status", handler).await;
        Ok(())
    }
    async fn destroy(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn enable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn disable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
}

async fn console_fixture(root: &std::path::Path) -> Console {
    let config = HostConfig {
        plugin_dir: root.join("plugins"),
        bundle_dir: root.join("bundles"),
        data_dir: root.join("data"),
        ..Default::default()
    };
    let mut console = Console::new(config).unwrap();
    console.initialize().await.unwrap();
    console.start().await.unwrap();
    console
}

#[tokio::test]
async fn plugins_exchange_messages_over_the_bus() {
    let dir = tempdir().unwrap();
    let mut console = console_fixture(dir.path()).await;
    let manager = console.plugin_manager().clone();

    let received = Arc::new(Mutex::new(Vec::new()));
    manager
        .load_instance(Box::new(ListenerPlugin {
            received: received.clone(),
        }))
        .await
        .unwrap();

    console
        .messaging()
        .publish("field.reports", json!({ "sector": 7 }))
        .await
        .unwrap();

    let seen = received.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].payload["sector"], 7);
    drop(seen);

    console.shutdown().await.unwrap();
}

#[tokio::test]
async fn request_reply_crosses_plugin_boundary() {
    let dir = tempdir().unwrap();
    let mut console = console_fixture(dir.path()).await;
    let manager = console.plugin_manager().clone();

    manager.load_instance(Box::new(ResponderPlugin)).await.unwrap();

    let answer = console
        .messaging()
        .request("responder.status", json!({}), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(answer["status"], "ready");

    console.shutdown().await.unwrap();
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let dir = tempdir().unwrap();
    let mut console = console_fixture(dir.path()).await;

    let err = console
        .messaging()
        .request("nobody.home", json!({}), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, MessagingError::Timeout { .. }));

    console.shutdown().await.unwrap();
}
