//! Overwatch panel: the status overview module shipped with the console.

use std::sync::Arc;

use blacktop_core::declare_component;
use blacktop_core::module_store::component::ModuleComponent;
use blacktop_core::plugin_system::metadata::{ModuleMetadata, ModuleType};

pub const MODULE_ID: &str = "overwatch-panel";

#[derive(Debug)]
pub struct OverwatchPanel;

impl OverwatchPanel {
    pub fn shared() -> Arc<dyn ModuleComponent> {
        Arc::new(OverwatchPanel)
    }
}

impl ModuleComponent for OverwatchPanel {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn title(&self) -> &str {
        "Overwatch Panel"
    }

    fn render(&self) -> String {
        "[overwatch-panel] sector status: nominal".to_string()
    }
}

/// Catalog entry for registering the panel with the module store.
pub fn catalog_entry() -> ModuleMetadata {
    let mut metadata = ModuleMetadata::new(
        MODULE_ID,
        "Overwatch Panel",
        ModuleType::FrontendUi,
        env!("CARGO_PKG_VERSION"),
    );
    metadata.description = "Status overview panel for the console".to_string();
    metadata.author = "Blacktop Developers".to_string();
    metadata.category = "panels".to_string();
    metadata.installed = true;
    metadata
}

declare_component!(OverwatchPanel::shared);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_identity_matches_catalog() {
        let panel = OverwatchPanel::shared();
        let entry = catalog_entry();
        assert_eq!(panel.id(), entry.id);
        assert_eq!(panel.title(), entry.name);
        assert!(panel.render().contains("overwatch-panel"));
        entry.validate().unwrap();
    }
}
