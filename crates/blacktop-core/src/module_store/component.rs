//! UI module components and the bundle declaration contract.

use std::fmt;
use std::sync::Arc;

/// A mountable UI module. `render` produces the mount surface for the
/// console shell; richer widget trees live behind it in the module crate.
pub trait ModuleComponent: Send + Sync + fmt::Debug {
    /// Stable identifier, matching the catalog entry
    fn id(&self) -> &str;

    /// Title shown in the console chrome
    fn title(&self) -> &str;

    /// Render the module's current surface
    fn render(&self) -> String;
}

/// Factory producing fresh component instances
pub type ComponentFactory = Arc<dyn Fn() -> Arc<dyn ModuleComponent> + Send + Sync>;

/// Static exported by every component bundle cdylib.
pub struct ComponentDeclaration {
    pub api_version: &'static str,
    pub create: fn() -> Arc<dyn ModuleComponent>,
}

/// Export a [`ComponentDeclaration`] from a bundle crate.
///
/// ```ignore
/// blacktop_core::declare_component!(OverwatchPanel::shared);
/// ```
#[macro_export]
macro_rules! declare_component {
    ($create:path) => {
        #[no_mangle]
        pub static COMPONENT_DECLARATION: $crate::module_store::component::ComponentDeclaration =
            $crate::module_store::component::ComponentDeclaration {
                api_version: $crate::kernel::constants::API_VERSION,
                create: $create,
            };
    };
}
