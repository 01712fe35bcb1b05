//! Console bootstrap: builds the core components, wires them through the
//! dependency registry, and drives their lifecycle in order.

use std::any::TypeId;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::HostConfig;
use crate::kernel::component::{DependencyRegistry, ServiceComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, LifecyclePhase, Result};
use crate::messaging::service::MessagingService;
use crate::module_store::resolver::{BundleResolver, LocalFactoryResolver};
use crate::module_store::store::ModuleStore;
use crate::plugin_system::installer::DirectoryInstaller;
use crate::plugin_system::manager::PluginManager;
use crate::storage::manager::StorageManager;

/// The console application: owns the core components and their lifecycle.
///
/// Components initialize and start in dependency order (storage, messaging,
/// plugin manager, module store) and stop in the reverse order.
pub struct Console {
    config: HostConfig,
    dependencies: Arc<Mutex<DependencyRegistry>>,
    init_order: Vec<TypeId>,
    initialized: bool,

    messaging: MessagingService,
    storage: StorageManager,
    manager: PluginManager,
    module_store: ModuleStore,
    local_factories: LocalFactoryResolver,
}

impl Console {
    /// Build a console from host configuration. Nothing is initialized yet;
    /// call [`Console::initialize`] and [`Console::start`] next.
    pub fn new(config: HostConfig) -> Result<Self> {
        log::info!("Bootstrapping {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let storage = StorageManager::new(config.data_dir.clone());
        let messaging = MessagingService::new(config.history_capacity);

        let installer = Arc::new(DirectoryInstaller::new(
            config.plugin_dir.clone(),
            config.trusted_sources.clone(),
        ));
        let manager = PluginManager::new(messaging.clone(), storage.clone(), installer)
            .map_err(|e| Error::Lifecycle {
                phase: LifecyclePhase::Bootstrap,
                component_name: Some("PluginManager".to_string()),
                message: e.to_string(),
                source: Some(Box::new(e.into())),
            })?;

        let local_factories = LocalFactoryResolver::new();
        let resolver = BundleResolver::new(config.bundle_dir.clone(), local_factories.clone())
            .map_err(|e| Error::Lifecycle {
                phase: LifecyclePhase::Bootstrap,
                component_name: Some("ModuleStore".to_string()),
                message: e.to_string(),
                source: Some(Box::new(e.into())),
            })?;
        let module_store = ModuleStore::new(messaging.clone(), storage.clone(), Arc::new(resolver));

        let mut registry = DependencyRegistry::new();
        let mut init_order = Vec::new();

        registry.register_instance(Arc::new(storage.clone()));
        init_order.push(TypeId::of::<StorageManager>());
        registry.register_instance(Arc::new(messaging.clone()));
        init_order.push(TypeId::of::<MessagingService>());
        registry.register_instance(Arc::new(manager.clone()));
        init_order.push(TypeId::of::<PluginManager>());
        registry.register_instance(Arc::new(module_store.clone()));
        init_order.push(TypeId::of::<ModuleStore>());

        Ok(Self {
            config,
            dependencies: Arc::new(Mutex::new(registry)),
            init_order,
            initialized: false,
            messaging,
            storage,
            manager,
            module_store,
            local_factories,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn messaging(&self) -> &MessagingService {
        &self.messaging
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.manager
    }

    pub fn module_store(&self) -> &ModuleStore {
        &self.module_store
    }

    /// Factories for statically bundled UI modules; register before loading.
    pub fn local_factories(&self) -> &LocalFactoryResolver {
        &self.local_factories
    }

    /// Get a shared component by concrete type.
    pub async fn get_component<T: ServiceComponent + 'static>(&self) -> Option<Arc<T>> {
        self.dependencies.lock().await.get_concrete::<T>()
    }

    fn lifecycle_error(phase: LifecyclePhase, name: &str, source: Error) -> Error {
        Error::Lifecycle {
            phase,
            component_name: Some(name.to_string()),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Initialize every component in registration order.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::Lifecycle {
                phase: LifecyclePhase::Initialize,
                component_name: None,
                message: "console already initialized".to_string(),
                source: None,
            });
        }
        let registry = self.dependencies.lock().await;
        for type_id in &self.init_order {
            if let Some(component) = registry.get_component_by_id(type_id) {
                log::debug!("Initializing component: {}", component.name());
                component
                    .initialize()
                    .await
                    .map_err(|e| Self::lifecycle_error(LifecyclePhase::Initialize, component.name(), e))?;
            }
        }
        self.initialized = true;
        Ok(())
    }

    /// Start every component in registration order.
    pub async fn start(&self) -> Result<()> {
        let registry = self.dependencies.lock().await;
        for type_id in &self.init_order {
            if let Some(component) = registry.get_component_by_id(type_id) {
                log::debug!("Starting component: {}", component.name());
                component
                    .start()
                    .await
                    .map_err(|e| Self::lifecycle_error(LifecyclePhase::Start, component.name(), e))?;
            }
        }
        log::info!("{} started", constants::APP_NAME);
        Ok(())
    }

    /// Stop every component in reverse registration order. Stop failures are
    /// logged and do not prevent the remaining components from stopping.
    pub async fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down {}", constants::APP_NAME);
        let registry = self.dependencies.lock().await;
        for type_id in self.init_order.iter().rev() {
            if let Some(component) = registry.get_component_by_id(type_id) {
                log::debug!("Stopping component: {}", component.name());
                if let Err(e) = component.stop().await {
                    log::error!("component '{}' failed to stop: {}", component.name(), e);
                }
            }
        }
        self.initialized = false;
        Ok(())
    }
}
