//! Backend plugin system: metadata registry, package installation, dynamic
//! loading, and lifecycle management.
//!
//! The [`manager::PluginManager`] is the entry point; it owns the
//! [`registry::PluginRegistry`], drives the [`loader::PluginLoader`] and a
//! [`installer::PluginInstaller`], and publishes every lifecycle transition
//! on the messaging bus.

pub mod context;
pub mod error;
pub mod installer;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod registry;
pub mod traits;


pub use context::{PluginContext, PluginLogger};
pub use error::PluginSystemError;
pub use installer::{DirectoryInstaller, InstallRecord, PluginInstaller, SignatureStatus};
pub use loader::{PluginDeclaration, PluginLoader};
pub use manager::{PluginManager, PluginInfo, PluginStatistics};
pub use metadata::{MetadataPatch, ModuleMetadata, ModuleType, Pricing, PricingModel};
pub use registry::PluginRegistry;
pub use traits::{Permission, Plugin};
