use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::storage::error::StorageSystemError;
use crate::storage::provider::KvStore;

type Result<T> = std::result::Result<T, StorageSystemError>;

/// File-backed key/value store. Each key maps to one JSON document under the
/// base directory; dots in keys become path separators. Writes go through a
/// temp file and rename so a crash never leaves a torn document.
#[derive(Clone)]
pub struct LocalKvStore {
    base_path: PathBuf,
}

impl LocalKvStore {
    /// Create a new local store rooted at the given base path.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(StorageSystemError::InvalidKey {
                key: key.to_string(),
                message: "key must not be empty".to_string(),
            });
        }
        for segment in key.split('.') {
            if segment.is_empty() || segment == ".." || segment.contains(['/', '\\']) {
                return Err(StorageSystemError::InvalidKey {
                    key: key.to_string(),
                    message: "key segments must be non-empty and free of path separators".to_string(),
                });
            }
        }
        let mut path = self.base_path.clone();
        for segment in key.split('.') {
            path.push(segment);
        }
        path.set_extension("json");
        Ok(path)
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base_path).ok()?;
        let rel = rel.with_extension("");
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("."))
        }
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .map_err(|e| StorageSystemError::io(e, "read_dir", dir.to_path_buf()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageSystemError::io(e, "read_dir", dir.to_path_buf()))?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(key) = self.path_to_key(&path) {
                    out.push(key);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LocalKvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKvStore")
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl KvStore for LocalKvStore {
    fn name(&self) -> &str {
        "local"
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| StorageSystemError::io(e, "read_to_string", path.clone()))?;
        let value = serde_json::from_str(&raw).map_err(|e| StorageSystemError::Deserialization {
            key: key.to_string(),
            source: e,
        })?;
        Ok(Some(value))
    }

    fn put_json(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", parent.to_path_buf()))?;
        }
        let raw = serde_json::to_string_pretty(value).map_err(|e| StorageSystemError::Serialization {
            key: key.to_string(),
            source: e,
        })?;
        // Write-then-rename keeps readers from ever seeing a partial document.
        let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        {
            let mut file = fs::File::create(&tmp_path)
                .map_err(|e| StorageSystemError::io(e, "create", tmp_path.clone()))?;
            file.write_all(raw.as_bytes())
                .map_err(|e| StorageSystemError::io(e, "write", tmp_path.clone()))?;
        }
        fs::rename(&tmp_path, &path).map_err(|e| StorageSystemError::io(e, "rename", path.clone()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|e| StorageSystemError::io(e, "remove_file", path.clone()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if self.base_path.is_dir() {
            self.collect_keys(&self.base_path.clone(), &mut out)?;
        }
        out.sort();
        Ok(out)
    }
}
