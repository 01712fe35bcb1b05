use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kernel::component::ServiceComponent;
use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::local::LocalKvStore;
use crate::storage::provider::KvStore;

/// Storage component wrapping a [`KvStore`] and adding typed access.
#[derive(Clone, Debug)]
pub struct StorageManager {
    name: &'static str,
    store: Arc<dyn KvStore>,
    base_path: PathBuf,
}

impl StorageManager {
    /// Create a storage manager backed by a [`LocalKvStore`] at `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        let store = Arc::new(LocalKvStore::new(base_path.clone())) as Arc<dyn KvStore>;
        Self {
            name: "StorageManager",
            store,
            base_path,
        }
    }

    /// Create a storage manager over a custom provider.
    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        Self {
            name: "StorageManager",
            store,
            base_path: PathBuf::from("."),
        }
    }

    /// The underlying key/value store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Read and deserialize the value under `key`.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> std::result::Result<Option<T>, StorageSystemError> {
        match self.store.get_json(key)? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageSystemError::Deserialization {
                    key: key.to_string(),
                    source: e,
                }),
        }
    }

    /// Serialize and store `value` under `key`.
    pub fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> std::result::Result<(), StorageSystemError> {
        let json = serde_json::to_value(value).map_err(|e| StorageSystemError::Serialization {
            key: key.to_string(),
            source: e,
        })?;
        self.store.put_json(key, &json)
    }

    /// Remove the value under `key`.
    pub fn delete(&self, key: &str) -> std::result::Result<(), StorageSystemError> {
        self.store.delete(key)
    }
}

#[async_trait]
impl ServiceComponent for StorageManager {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> Result<()> {
        if !self.base_path.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.base_path)
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", self.base_path.clone()))?;
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
