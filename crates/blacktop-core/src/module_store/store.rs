//! The client module store: catalog of available UI modules, loaded
//! component instances, and console UI state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libloading::Library;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::kernel::component::ServiceComponent;
use crate::kernel::constants;
use crate::kernel::error::Result as KernelResult;
use crate::messaging::service::MessagingService;
use crate::module_store::component::ModuleComponent;
use crate::module_store::error::ModuleStoreError;
use crate::module_store::resolver::ComponentResolver;
use crate::plugin_system::metadata::{ModuleMetadata, ModuleType};
use crate::storage::manager::StorageManager;

/// Topics the store publishes module toggles on.
pub mod topics {
    pub const ENABLE: &str = "modules.enable";
    pub const DISABLE: &str = "modules.disable";
}

/// Label set used throughout the console UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminology {
    #[default]
    Military,
    Civilian,
}

/// State of one module in the store. A module is either still resolving,
/// ready with its component, or failed with a reason; there is no state
/// carrying both a component and an error.
#[derive(Clone)]
pub enum ModuleState {
    Loading,
    Ready(Arc<dyn ModuleComponent>),
    Failed(String),
}

impl fmt::Debug for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Loading => write!(f, "Loading"),
            ModuleState::Ready(component) => write!(f, "Ready({})", component.id()),
            ModuleState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Serializable snapshot of a module's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ModuleStatus {
    Loading,
    Ready,
    Failed(String),
}

struct LoadedModule {
    metadata: ModuleMetadata,
    state: ModuleState,
    _library: Option<Library>,
    loaded_at: DateTime<Utc>,
}

impl LoadedModule {
    fn status(&self) -> ModuleStatus {
        match &self.state {
            ModuleState::Loading => ModuleStatus::Loading,
            ModuleState::Ready(_) => ModuleStatus::Ready,
            ModuleState::Failed(reason) => ModuleStatus::Failed(reason.clone()),
        }
    }
}

struct Inner {
    available: Vec<ModuleMetadata>,
    loaded: HashMap<String, LoadedModule>,
    marketplace_open: bool,
    terminology: Terminology,
}

/// Client-side module store.
///
/// Holds the catalog of available modules, resolves and caches loaded
/// component instances, and owns the console UI flags. Loads for one id are
/// single-flight: a second concurrent `load` waits for the first and then
/// observes its outcome instead of racing a duplicate resolution.
#[derive(Clone)]
pub struct ModuleStore {
    name: &'static str,
    messaging: MessagingService,
    storage: StorageManager,
    resolver: Arc<dyn ComponentResolver>,
    inner: Arc<Mutex<Inner>>,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl fmt::Debug for ModuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ModuleStore {
    pub fn new(
        messaging: MessagingService,
        storage: StorageManager,
        resolver: Arc<dyn ComponentResolver>,
    ) -> Self {
        Self {
            name: "ModuleStore",
            messaging,
            storage,
            resolver,
            inner: Arc::new(Mutex::new(Inner {
                available: Vec::new(),
                loaded: HashMap::new(),
                marketplace_open: false,
                terminology: Terminology::default(),
            })),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Replace the available-module catalog.
    pub async fn set_available(&self, modules: Vec<ModuleMetadata>) {
        self.inner.lock().await.available = modules;
    }

    pub async fn available(&self) -> Vec<ModuleMetadata> {
        self.inner.lock().await.available.clone()
    }

    pub async fn catalog_entry(&self, id: &str) -> Option<ModuleMetadata> {
        self.inner
            .lock()
            .await
            .available
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Catalog entries of one module type.
    pub async fn by_type(&self, module_type: ModuleType) -> Vec<ModuleMetadata> {
        self.inner
            .lock()
            .await
            .available
            .iter()
            .filter(|m| m.module_type == module_type)
            .cloned()
            .collect()
    }

    /// Load a module from the catalog, resolving its component.
    ///
    /// Loading an id absent from the catalog is an error, not a silent no-op.
    /// Loading an id that is already ready returns the existing component.
    pub async fn load(&self, id: &str) -> Result<Arc<dyn ModuleComponent>, ModuleStoreError> {
        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;

        let metadata = {
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.loaded.get(id) {
                if let ModuleState::Ready(component) = &entry.state {
                    return Ok(component.clone());
                }
            }
            let metadata = inner
                .available
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| ModuleStoreError::UnknownModule {
                    module_id: id.to_string(),
                })?;
            inner.loaded.insert(
                id.to_string(),
                LoadedModule {
                    metadata: metadata.clone(),
                    state: ModuleState::Loading,
                    _library: None,
                    loaded_at: Utc::now(),
                },
            );
            metadata
        };

        match self.resolver.resolve(&metadata).await {
            Ok(resolved) => {
                let component = resolved.component.clone();
                let mut inner = self.inner.lock().await;
                inner.loaded.insert(
                    id.to_string(),
                    LoadedModule {
                        metadata,
                        state: ModuleState::Ready(resolved.component),
                        _library: resolved.library,
                        loaded_at: Utc::now(),
                    },
                );
                log::info!("module '{}' ready", id);
                Ok(component)
            }
            Err(e) => {
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.loaded.get_mut(id) {
                    entry.state = ModuleState::Failed(e.to_string());
                }
                log::error!("module '{}' failed to load: {}", id, e);
                Err(e)
            }
        }
    }

    /// Drop a module's loaded state. Unloading an id that is not loaded is a
    /// no-op.
    pub async fn unload(&self, id: &str) {
        let lock = self.id_lock(id).await;
        let _guard = lock.lock().await;
        self.inner.lock().await.loaded.remove(id);
    }

    /// Enable a module: flip the catalog flag, reload the component when one
    /// was loaded, and notify the server side in the background.
    pub async fn enable(&self, id: &str) -> Result<(), ModuleStoreError> {
        let was_loaded = {
            let mut inner = self.inner.lock().await;
            let entry = inner
                .available
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| ModuleStoreError::UnknownModule {
                    module_id: id.to_string(),
                })?;
            entry.enabled = true;
            inner.loaded.contains_key(id)
        };

        self.notify(topics::ENABLE, id);

        if was_loaded {
            self.unload(id).await;
            self.load(id).await?;
        }
        Ok(())
    }

    /// Disable a module: drop its loaded state, flip the catalog flag, and
    /// notify the server side in the background.
    pub async fn disable(&self, id: &str) -> Result<(), ModuleStoreError> {
        self.unload(id).await;
        {
            let mut inner = self.inner.lock().await;
            let entry = inner
                .available
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| ModuleStoreError::UnknownModule {
                    module_id: id.to_string(),
                })?;
            entry.enabled = false;
        }
        self.notify(topics::DISABLE, id);
        Ok(())
    }

    /// Fire-and-forget server notification; failures are logged only.
    fn notify(&self, topic: &'static str, id: &str) {
        let messaging = self.messaging.clone();
        let payload = json!({ "module_id": id });
        tokio::spawn(async move {
            if let Err(e) = messaging.publish(topic, payload).await {
                log::warn!("module store: failed to publish {}: {}", topic, e);
            }
        });
    }

    /// The ready component for `id`, if any.
    pub async fn loaded_module(&self, id: &str) -> Option<Arc<dyn ModuleComponent>> {
        let inner = self.inner.lock().await;
        match inner.loaded.get(id) {
            Some(LoadedModule {
                state: ModuleState::Ready(component),
                ..
            }) => Some(component.clone()),
            _ => None,
        }
    }

    /// Current state snapshot for `id`, when the store has one.
    pub async fn module_status(&self, id: &str) -> Option<ModuleStatus> {
        self.inner.lock().await.loaded.get(id).map(LoadedModule::status)
    }

    pub async fn is_loaded(&self, id: &str) -> bool {
        matches!(
            self.inner.lock().await.loaded.get(id),
            Some(LoadedModule {
                state: ModuleState::Ready(_),
                ..
            })
        )
    }

    /// Ids with any loaded state, with metadata and load time.
    pub async fn loaded_summaries(&self) -> Vec<(ModuleMetadata, ModuleStatus, DateTime<Utc>)> {
        self.inner
            .lock()
            .await
            .loaded
            .values()
            .map(|m| (m.metadata.clone(), m.status(), m.loaded_at))
            .collect()
    }

    pub async fn set_marketplace_open(&self, open: bool) {
        self.inner.lock().await.marketplace_open = open;
    }

    pub async fn is_marketplace_open(&self) -> bool {
        self.inner.lock().await.marketplace_open
    }

    /// Set the UI terminology mode and persist it.
    pub async fn set_terminology(&self, terminology: Terminology) -> Result<(), ModuleStoreError> {
        self.inner.lock().await.terminology = terminology;
        self.storage.put(constants::TERMINOLOGY_KEY, &terminology)?;
        Ok(())
    }

    pub async fn terminology(&self) -> Terminology {
        self.inner.lock().await.terminology
    }

    /// Restore persisted UI state. Missing state keeps the defaults.
    pub async fn restore(&self) -> Result<(), ModuleStoreError> {
        if let Some(terminology) = self.storage.get::<Terminology>(constants::TERMINOLOGY_KEY)? {
            self.inner.lock().await.terminology = terminology;
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceComponent for ModuleStore {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> KernelResult<()> {
        self.restore().await?;
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        let mut inner = self.inner.lock().await;
        inner.loaded.clear();
        Ok(())
    }
}
