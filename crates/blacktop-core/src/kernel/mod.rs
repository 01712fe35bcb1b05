//! # Blacktop Core Kernel
//!
//! The kernel owns the fundamentals of the console: bootstrapping via
//! [`Console`](bootstrap::Console), the [`ServiceComponent`](component::ServiceComponent)
//! lifecycle trait with its [`DependencyRegistry`](component::DependencyRegistry),
//! system-wide constants, and the aggregate [`Error`](error::Error) type.

pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::Console;
pub use component::{DependencyRegistry, ServiceComponent};
pub use error::{Error, LifecyclePhase, Result};

#[cfg(test)]
mod tests;
