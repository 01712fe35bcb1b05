use std::fmt::Debug;

use serde_json::Value;

use crate::storage::error::StorageSystemError;

/// Durable key/value storage used for preferences and install records.
///
/// Keys are dotted paths (`preferences.terminology`, `installs.weather`).
/// Values are JSON documents; typed access goes through the serde helpers on
/// the caller side.
pub trait KvStore: Send + Sync + Debug {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any.
    fn get_json(&self, key: &str) -> Result<Option<Value>, StorageSystemError>;

    /// Store `value` under `key`, replacing any prior value.
    fn put_json(&self, key: &str, value: &Value) -> Result<(), StorageSystemError>;

    /// Remove the value under `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<(), StorageSystemError>;

    /// List all stored keys.
    fn keys(&self) -> Result<Vec<String>, StorageSystemError>;
}
