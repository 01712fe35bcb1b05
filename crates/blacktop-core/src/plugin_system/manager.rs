use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libloading::Library;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::kernel::component::ServiceComponent;
use crate::kernel::constants;
use crate::kernel::error::Result as KernelResult;
use crate::messaging::service::MessagingService;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::installer::{InstallRecord, PluginInstaller, MANIFEST_FILE};
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::metadata::{read_manifest, ModuleMetadata};
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::{Permission, Plugin};

/// Lifecycle event topics published on the messaging bus.
pub mod topics {
    pub const BEFORE_INSTALL: &str = "plugins.before_install";
    pub const INSTALLED: &str = "plugins.installed";
    pub const LOADED: &str = "plugins.loaded";
    pub const UNLOADED: &str = "plugins.unloaded";
    pub const ENABLED: &str = "plugins.enabled";
    pub const DISABLED: &str = "plugins.disabled";
    pub const UNINSTALLED: &str = "plugins.uninstalled";
    pub const ERROR: &str = "plugins.error";
}

/// Identity and state of one loaded plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub dependencies: Vec<String>,
    pub permissions: Vec<Permission>,
    pub enabled: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Manager-wide counters.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatistics {
    pub registered: usize,
    pub installed: usize,
    pub loaded: usize,
    pub enabled: usize,
    pub uptime_secs: u64,
}

/// A loaded plugin instance with its context and, for dynamic plugins, the
/// mapped library. Field order matters: the instance must drop before the
/// library is unmapped.
struct LoadedPlugin {
    instance: Arc<dyn Plugin>,
    #[allow(dead_code)]
    context: Arc<PluginContext>,
    _library: Option<Library>,
    enabled: bool,
    loaded_at: DateTime<Utc>,
}

impl LoadedPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            id: self.instance.id().to_string(),
            name: self.instance.name().to_string(),
            version: self.instance.version().to_string(),
            description: self.instance.description().to_string(),
            author: self.instance.author().to_string(),
            dependencies: self.instance.dependencies(),
            permissions: self.instance.permissions(),
            enabled: self.enabled,
            loaded_at: self.loaded_at,
        }
    }
}

/// Installs, loads, sandboxes, and lifecycles backend plugins.
///
/// Lifecycle operations on a given plugin id serialize through a per-id lock,
/// so overlapping calls cannot race the shared tables. Every transition
/// publishes a message on the bus (see [`topics`]).
#[derive(Clone)]
pub struct PluginManager {
    name: &'static str,
    messaging: MessagingService,
    storage: crate::storage::manager::StorageManager,
    installer: Arc<dyn PluginInstaller>,
    loader: Arc<PluginLoader>,
    registry: Arc<Mutex<PluginRegistry>>,
    loaded: Arc<Mutex<HashMap<String, LoadedPlugin>>>,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    started_at: Instant,
}

impl Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    pub fn new(
        messaging: MessagingService,
        storage: crate::storage::manager::StorageManager,
        installer: Arc<dyn PluginInstaller>,
    ) -> Result<Self, PluginSystemError> {
        Ok(Self {
            name: "PluginManager",
            messaging,
            storage,
            installer,
            loader: Arc::new(PluginLoader::new()?),
            registry: Arc::new(Mutex::new(PluginRegistry::new())),
            loaded: Arc::new(Mutex::new(HashMap::new())),
            locks: Arc::new(Mutex::new(HashMap::new())),
            started_at: Instant::now(),
        })
    }

    /// Shared handle to the metadata registry.
    pub fn registry(&self) -> &Arc<Mutex<PluginRegistry>> {
        &self.registry
    }

    /// The per-id lock serializing lifecycle operations for one plugin.
    async fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn publish_event(&self, topic: &str, payload: serde_json::Value) {
        if let Err(e) = self.messaging.publish(topic, payload).await {
            log::warn!("plugin manager: failed to publish {}: {}", topic, e);
        }
    }

    async fn publish_error(&self, plugin_id: &str, operation: &str, error: &PluginSystemError) {
        self.publish_event(
            topics::ERROR,
            json!({
                "plugin_id": plugin_id,
                "operation": operation,
                "error": error.to_string(),
            }),
        )
        .await;
    }

    /// Install a plugin package and register its metadata.
    pub async fn install(
        &self,
        spec: &str,
        version: Option<&str>,
    ) -> Result<InstallRecord, PluginSystemError> {
        self.publish_event(topics::BEFORE_INSTALL, json!({ "spec": spec })).await;

        let record = match self.installer.install(spec, version).await {
            Ok(record) => record,
            Err(e) => {
                self.publish_error(spec, "install", &e).await;
                return Err(e);
            }
        };

        // Register manifest metadata straight from the installed package.
        let package_dir = self.installer.resolve(&record.id)?;
        let mut metadata = read_manifest(&package_dir.join(MANIFEST_FILE))?;
        metadata.installed = true;
        self.registry.lock().await.register(metadata);

        if let Err(e) = self.storage.put(
            &format!("{}.{}", constants::INSTALL_RECORD_PREFIX, record.id),
            &record,
        ) {
            log::warn!("plugin manager: failed to persist install record for '{}': {}", record.id, e);
        }

        self.publish_event(
            topics::INSTALLED,
            json!({ "plugin_id": record.id, "version": record.version, "trusted": record.trusted }),
        )
        .await;
        Ok(record)
    }

    /// Load an installed plugin: resolve its package, map the library,
    /// validate the contract, build its context, and run `initialize`.
    ///
    /// Loading an id that is already loaded replaces the previous instance;
    /// callers gate on [`PluginManager::is_loaded`] first.
    pub async fn load(&self, id: &str) -> Result<PluginInfo, PluginSystemError> {
        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;

        let result = self.load_locked(id).await;
        if let Err(e) = &result {
            self.publish_error(id, "load", e).await;
        }
        result
    }

    async fn load_locked(&self, id: &str) -> Result<PluginInfo, PluginSystemError> {
        let package_dir = self.installer.resolve(id)?;
        let metadata = read_manifest(&package_dir.join(MANIFEST_FILE))?;
        let library_path = package_dir.join(metadata.library_file());

        let (instance, library) = self.loader.load_dynamic(id, &library_path)?;
        self.finish_load(id, Arc::from(instance), Some(library), metadata.enabled)
            .await
    }

    /// Load an in-process plugin instance (statically bundled plugins and
    /// tests). Same contract validation and lifecycle as dynamic loading.
    pub async fn load_instance(
        &self,
        instance: Box<dyn Plugin>,
    ) -> Result<PluginInfo, PluginSystemError> {
        let id = instance.id().to_string();
        let lock = self.id_lock(&id).await;
        let _guard = lock.lock().await;

        let result = async {
            self.loader.validate_contract(&id, instance.as_ref())?;
            self.finish_load(&id, Arc::from(instance), None, false).await
        }
        .await;
        if let Err(e) = &result {
            self.publish_error(&id, "load", e).await;
        }
        result
    }

    async fn finish_load(
        &self,
        id: &str,
        instance: Arc<dyn Plugin>,
        library: Option<Library>,
        enabled: bool,
    ) -> Result<PluginInfo, PluginSystemError> {
        let context = Arc::new(PluginContext::new(
            id,
            self.messaging.clone(),
            self.storage.clone(),
        ));
        instance
            .initialize(&context)
            .await
            .map_err(|e| PluginSystemError::Initialization {
                plugin_id: id.to_string(),
                message: e.to_string(),
            })?;

        let entry = LoadedPlugin {
            instance,
            context,
            _library: library,
            enabled,
            loaded_at: Utc::now(),
        };
        let info = entry.info();

        {
            let mut loaded = self.loaded.lock().await;
            if loaded.insert(id.to_string(), entry).is_some() {
                log::warn!("plugin manager: replaced already-loaded plugin '{}'", id);
            }
        }
        {
            let mut registry = self.registry.lock().await;
            if !registry.contains(id) {
                let mut metadata = ModuleMetadata::new(
                    id,
                    &info.name,
                    crate::plugin_system::metadata::ModuleType::Backend,
                    &info.version,
                );
                metadata.description = info.description.clone();
                metadata.author = info.author.clone();
                registry.register(metadata);
            }
            registry.mark_installed(id, true);
        }

        self.publish_event(
            topics::LOADED,
            json!({ "plugin_id": id, "version": info.version }),
        )
        .await;
        log::info!("plugin '{}' v{} loaded", id, info.version);
        Ok(info)
    }

    /// Unload a plugin. The bookkeeping entry is removed before `destroy` is
    /// awaited, so a failing hook can never leak it; the hook error still
    /// propagates.
    pub async fn unload(&self, id: &str) -> Result<(), PluginSystemError> {
        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;

        let entry = {
            let mut loaded = self.loaded.lock().await;
            loaded.remove(id).ok_or_else(|| PluginSystemError::NotLoaded {
                plugin_id: id.to_string(),
            })?
        };

        let result = entry.instance.destroy().await;
        // Drop after destroy so the library stays mapped through the hook.
        drop(entry);

        self.publish_event(topics::UNLOADED, json!({ "plugin_id": id })).await;
        result.map_err(|e| {
            let err = PluginSystemError::Shutdown {
                plugin_id: id.to_string(),
                message: e.to_string(),
            };
            log::error!("plugin '{}' destroy hook failed: {}", id, e);
            err
        })
    }

    /// Enable a loaded plugin.
    pub async fn enable(&self, id: &str) -> Result<(), PluginSystemError> {
        self.set_enabled(id, true).await
    }

    /// Disable a loaded plugin without unloading it.
    pub async fn disable(&self, id: &str) -> Result<(), PluginSystemError> {
        self.set_enabled(id, false).await
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), PluginSystemError> {
        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;

        let instance = {
            let loaded = self.loaded.lock().await;
            loaded
                .get(id)
                .map(|entry| entry.instance.clone())
                .ok_or_else(|| PluginSystemError::NotLoaded {
                    plugin_id: id.to_string(),
                })?
        };

        let result = if enabled {
            instance.enable().await
        } else {
            instance.disable().await
        };
        if let Err(e) = result {
            let err = PluginSystemError::Operation {
                plugin_id: id.to_string(),
                message: e.to_string(),
            };
            self.publish_error(id, if enabled { "enable" } else { "disable" }, &err)
                .await;
            return Err(err);
        }

        if let Some(entry) = self.loaded.lock().await.get_mut(id) {
            entry.enabled = enabled;
        }
        self.registry.lock().await.mark_enabled(id, enabled);

        let topic = if enabled { topics::ENABLED } else { topics::DISABLED };
        self.publish_event(topic, json!({ "plugin_id": id })).await;
        Ok(())
    }

    /// Uninstall a plugin: unload first when loaded, then remove package
    /// files and the install record.
    pub async fn uninstall(&self, id: &str) -> Result<(), PluginSystemError> {
        if self.is_loaded(id).await {
            self.unload(id).await?;
        }

        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;

        self.installer.remove(id).await?;
        if let Err(e) = self
            .storage
            .delete(&format!("{}.{}", constants::INSTALL_RECORD_PREFIX, id))
        {
            log::warn!("plugin manager: failed to remove install record for '{}': {}", id, e);
        }
        self.registry.lock().await.mark_installed(id, false);

        self.publish_event(topics::UNINSTALLED, json!({ "plugin_id": id })).await;
        Ok(())
    }

    /// Metadata of every registered module currently marked installed.
    pub async fn installed_plugins(&self) -> Vec<ModuleMetadata> {
        self.registry
            .lock()
            .await
            .all()
            .into_iter()
            .filter(|m| m.installed)
            .collect()
    }

    /// Info for every loaded plugin.
    pub async fn loaded_plugins(&self) -> Vec<PluginInfo> {
        self.loaded.lock().await.values().map(LoadedPlugin::info).collect()
    }

    /// Info for one loaded plugin, if loaded.
    pub async fn plugin_info(&self, id: &str) -> Option<PluginInfo> {
        self.loaded.lock().await.get(id).map(LoadedPlugin::info)
    }

    pub async fn is_loaded(&self, id: &str) -> bool {
        self.loaded.lock().await.contains_key(id)
    }

    pub async fn statistics(&self) -> PluginStatistics {
        let registry = self.registry.lock().await;
        let loaded = self.loaded.lock().await;
        PluginStatistics {
            registered: registry.len(),
            installed: registry.all().iter().filter(|m| m.installed).count(),
            loaded: loaded.len(),
            enabled: loaded.values().filter(|p| p.enabled).count(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Unload every loaded plugin best-effort: individual failures are
    /// logged, not propagated, and never abort the sweep.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = {
            let loaded = self.loaded.lock().await;
            loaded.keys().cloned().collect()
        };
        for id in ids {
            if let Err(e) = self.unload(&id).await {
                log::error!("plugin manager: shutdown unload of '{}' failed: {}", id, e);
            }
        }
        self.locks.lock().await.clear();
    }
}

#[async_trait]
impl ServiceComponent for PluginManager {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        self.shutdown().await;
        Ok(())
    }
}
