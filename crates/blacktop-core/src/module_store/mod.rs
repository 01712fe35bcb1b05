//! Client module store: catalog, component resolution, and UI state for the
//! console's loadable frontend modules.

pub mod component;
pub mod error;
pub mod resolver;
pub mod store;


pub use component::{ComponentDeclaration, ComponentFactory, ModuleComponent};
pub use error::{ModuleStoreError, ModuleStoreResult};
pub use resolver::{BundleResolver, ComponentResolver, LocalFactoryResolver, ResolvedComponent};
pub use store::{ModuleState, ModuleStatus, ModuleStore, Terminology};
