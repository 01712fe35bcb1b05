use thiserror::Error;

use crate::storage::error::StorageSystemError;

/// Errors from the client module store
#[derive(Debug, Error)]
pub enum ModuleStoreError {
    #[error("Unknown module '{module_id}': not in the available catalog")]
    UnknownModule { module_id: String },

    #[error("Module '{module_id}' is not loaded")]
    NotLoaded { module_id: String },

    #[error("Failed to fetch bundle for module '{module_id}': {message}")]
    Fetch { module_id: String, message: String },

    #[error("Failed to resolve component for module '{module_id}': {message}")]
    Resolve { module_id: String, message: String },

    #[error("Storage error in module store: {0}")]
    Storage(#[from] StorageSystemError),

    #[error("Module store internal error: {0}")]
    Internal(String),
}

pub type ModuleStoreResult<T> = Result<T, ModuleStoreError>;
