//! End-to-end console lifecycle: bootstrap, plugin install/load/unload with
//! bus-visible transitions, module store loads, and persisted UI state.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;

use crate::config::HostConfig;
use crate::kernel::bootstrap::Console;
use crate::module_store::component::ModuleComponent;
use crate::module_store::store::Terminology;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manager::topics;
use crate::plugin_system::metadata::{ModuleMetadata, ModuleType};
use crate::plugin_system::traits::Plugin;

struct WeatherPlugin;

#[async_trait]
impl Plugin for WeatherPlugin {
    fn id(&self) -> &str {
        "weather"
    }
    fn name(&self) -> &str {
        "Weather Feed"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "weather overlays"
    }
    fn author(&self) -> &str {
        "blacktop"
    }
    async fn initialize(&self, context: &PluginContext) -> Result<(), PluginSystemError> {
        context.logger().info("initializing");
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

#[derive(Debug)]
struct PanelComponent;

impl ModuleComponent for PanelComponent {
    fn id(&self) -> &str {
        "overwatch-panel"
    }
    fn title(&self) -> &str {
        "Overwatch Panel"
    }
    fn render(&self) -> String {
        "<overwatch-panel>".to_string()
    }
}

fn test_config(root: &std::path::Path) -> HostConfig {
    HostConfig {
        plugin_dir: root.join("plugins"),
        bundle_dir: root.join("bundles"),
        data_dir: root.join("data"),
        ..Default::default()
    }
}

async fn console_fixture(root: &std::path::Path) -> Console {
    let mut console = Console::new(test_config(root)).unwrap();
    console.initialize().await.unwrap();
    console.start().await.unwrap();
    console
}

#[tokio::test]
async fn plugin_lifecycle_is_visible_on_the_bus() {
    let dir = tempdir().unwrap();
    let mut console = console_fixture(dir.path()).await;
    let manager = console.plugin_manager().clone();
    let messaging = console.messaging().clone();

    manager.load_instance(Box::new(WeatherPlugin)).await.unwrap();
    manager.enable("weather").await.unwrap();
    manager.disable("weather").await.unwrap();
    manager.unload("weather").await.unwrap();

    for topic in [
        topics::LOADED,
        topics::ENABLED,
        topics::DISABLED,
        topics::UNLOADED,
    ] {
        let events = messaging.history(topic, None).await;
        assert_eq!(events.len(), 1, "expected one event on {}", topic);
        assert_eq!(events[0].payload["plugin_id"], "weather");
    }

    console.shutdown().await.unwrap();
}

#[tokio::test]
async fn install_survives_console_restart() {
    let dir = tempdir().unwrap();

    let source = dir.path().join("incoming/weather");
    fs::create_dir_all(&source).unwrap();
    fs::write(
        source.join("module.json"),
        serde_json::json!({
            "id": "weather",
            "name": "Weather Feed",
            "type": "backend",
            "version": "1.0.0",
        })
        .to_string(),
    )
    .unwrap();

    {
        let mut console = console_fixture(dir.path()).await;
        console
            .plugin_manager()
            .install(source.to_str().unwrap(), None)
            .await
            .unwrap();
        console.shutdown().await.unwrap();
    }

    // Package files and the install record are still there for a new console.
    let mut console = console_fixture(dir.path()).await;
    assert!(dir.path().join("plugins/weather/module.json").is_file());
    let record: Option<crate::plugin_system::installer::InstallRecord> = console
        .storage()
        .get("installs.weather")
        .unwrap();
    assert_eq!(record.unwrap().id, "weather");
    console.shutdown().await.unwrap();
}

#[tokio::test]
async fn module_store_serves_registered_factories() {
    let dir = tempdir().unwrap();
    let mut console = console_fixture(dir.path()).await;

    console
        .local_factories()
        .register("overwatch-panel", Arc::new(|| Arc::new(PanelComponent)))
        .await;
    console
        .module_store()
        .set_available(vec![ModuleMetadata::new(
            "overwatch-panel",
            "Overwatch Panel",
            ModuleType::FrontendUi,
            "0.1.0",
        )])
        .await;

    let component = console.module_store().load("overwatch-panel").await.unwrap();
    assert_eq!(component.render(), "<overwatch-panel>");
    assert!(console.module_store().is_loaded("overwatch-panel").await);

    console.shutdown().await.unwrap();
    // Loaded modules do not survive shutdown.
    assert!(!console.module_store().is_loaded("overwatch-panel").await);
}

#[tokio::test]
async fn terminology_survives_console_restart() {
    let dir = tempdir().unwrap();

    {
        let mut console = console_fixture(dir.path()).await;
        console
            .module_store()
            .set_terminology(Terminology::Civilian)
            .await
            .unwrap();
        console.shutdown().await.unwrap();
    }

    let mut console = console_fixture(dir.path()).await;
    assert_eq!(
        console.module_store().terminology().await,
        Terminology::Civilian
    );
    console.shutdown().await.unwrap();
}
