//! # Blacktop Core
//!
//! Core engine of the Blacktop Blackout console: a kernel with lifecycle-
//! managed service components, a topic-based messaging bus, a backend plugin
//! system with dynamic loading, a client module store for UI modules, local
//! JSON storage, and an HTTP API over the plugin manager.

pub mod api;
pub mod config;
pub mod kernel;
pub mod messaging;
pub mod module_store;
pub mod plugin_system;
pub mod storage;

pub use config::HostConfig;
pub use kernel::{Console, Error as KernelError};
pub use messaging::service::MessagingService;
pub use module_store::{ModuleComponent, ModuleStore, Terminology};
pub use plugin_system::{Plugin, PluginManager, PluginSystemError};
pub use storage::manager::StorageManager;

#[cfg(test)]
mod tests;
