use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::component::{DependencyRegistry, ServiceComponent};
use crate::kernel::error::Result;

#[derive(Debug, Default)]
struct CountingComponent {
    initialized: AtomicUsize,
}

#[async_trait]
impl ServiceComponent for CountingComponent {
    fn name(&self) -> &'static str {
        "CountingComponent"
    }
    async fn initialize(&self) -> Result<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn start(&self) -> Result<()> {
        Ok(())
    }
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn registry_stores_and_recovers_concrete_types() {
    let mut registry = DependencyRegistry::new();
    let component = Arc::new(CountingComponent::default());
    registry.register_instance(component.clone());

    let by_id = registry
        .get_component_by_id(&TypeId::of::<CountingComponent>())
        .unwrap();
    assert_eq!(by_id.name(), "CountingComponent");
    by_id.initialize().await.unwrap();

    let concrete = registry.get_concrete::<CountingComponent>().unwrap();
    assert_eq!(concrete.initialized.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&component, &concrete));
}

#[test]
fn registry_clear_drops_everything() {
    let mut registry = DependencyRegistry::new();
    registry.register_instance(Arc::new(CountingComponent::default()));
    assert_eq!(registry.get_all_components().len(), 1);

    registry.clear();
    assert!(registry.get_all_components().is_empty());
    assert!(registry.get_concrete::<CountingComponent>().is_none());
}
