//! Durable key/value storage.
//!
//! The console persists small JSON documents: client preferences (the
//! terminology mode) and plugin install records. [`KvStore`] is the provider
//! seam; [`LocalKvStore`] is the file-backed default.

pub mod error;
pub mod local;
pub mod manager;
pub mod provider;

pub use error::StorageSystemError;
pub use local::LocalKvStore;
pub use manager::StorageManager;
pub use provider::KvStore;
