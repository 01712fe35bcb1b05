use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::Result;

/// Core lifecycle trait for all console service components
#[async_trait]
pub trait ServiceComponent: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Registry storing components as `Arc<dyn ServiceComponent>`, keyed by the
/// concrete type's `TypeId`.
#[derive(Default, Debug)]
pub struct DependencyRegistry {
    instances: HashMap<TypeId, Arc<dyn ServiceComponent>>,
}

impl DependencyRegistry {
    /// Create a new empty dependency registry
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Register a component instance under the TypeId of its concrete type.
    pub fn register_instance<V>(&mut self, instance: Arc<V>)
    where
        V: ServiceComponent + 'static,
    {
        self.instances.insert(TypeId::of::<V>(), instance);
    }

    /// Get a component instance by the TypeId of its concrete type.
    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn ServiceComponent>> {
        self.instances.get(type_id).cloned()
    }

    /// Get a component instance by concrete type T.
    pub fn get_concrete<T: ServiceComponent + 'static>(&self) -> Option<Arc<T>> {
        self.instances.get(&TypeId::of::<T>()).and_then(|arc_sc| {
            let arc_any: Arc<dyn Any + Send + Sync> = arc_sc.clone();
            Arc::downcast::<T>(arc_any).ok()
        })
    }

    /// Get all registered component trait objects.
    pub fn get_all_components(&self) -> Vec<Arc<dyn ServiceComponent>> {
        self.instances.values().cloned().collect()
    }

    /// Clear all instances.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
