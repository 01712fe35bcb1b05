use std::collections::HashMap;

use crate::plugin_system::metadata::{MetadataPatch, ModuleMetadata, ModuleType};

/// In-memory catalog of module metadata.
///
/// Registration is an idempotent upsert keyed by id; unregistering an absent
/// id is a no-op. The catalog is independent of whether a plugin is loaded,
/// and none of its operations fail.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    modules: HashMap<String, ModuleMetadata>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Upsert metadata, replacing any prior entry for the id wholesale.
    pub fn register(&mut self, metadata: ModuleMetadata) {
        self.modules.insert(metadata.id.clone(), metadata);
    }

    /// Remove an entry. Does not affect a currently loaded plugin.
    pub fn unregister(&mut self, id: &str) {
        self.modules.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<&ModuleMetadata> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// All entries; order is not significant.
    pub fn all(&self) -> Vec<ModuleMetadata> {
        self.modules.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Case-insensitive substring search over name, description, and tags,
    /// AND an optional exact type filter.
    pub fn search(&self, query: &str, module_type: Option<ModuleType>) -> Vec<ModuleMetadata> {
        self.modules
            .values()
            .filter(|m| m.matches_query(query))
            .filter(|m| module_type.is_none_or(|t| m.module_type == t))
            .cloned()
            .collect()
    }

    /// Exact category match.
    pub fn by_category(&self, category: &str) -> Vec<ModuleMetadata> {
        self.modules
            .values()
            .filter(|m| m.category == category)
            .cloned()
            .collect()
    }

    /// Merge a partial update into an existing entry, stamping
    /// `last_updated`. No-op when the id is absent.
    pub fn update(&mut self, id: &str, patch: MetadataPatch) {
        if let Some(metadata) = self.modules.get_mut(id) {
            patch.apply(metadata);
        }
    }

    /// Flip the installed flag in place, preserving the rest of the entry.
    pub(crate) fn mark_installed(&mut self, id: &str, installed: bool) {
        if let Some(metadata) = self.modules.get_mut(id) {
            metadata.installed = installed;
        }
    }

    /// Flip the enabled flag in place.
    pub(crate) fn mark_enabled(&mut self, id: &str, enabled: bool) {
        if let Some(metadata) = self.modules.get_mut(id) {
            metadata.enabled = enabled;
        }
    }
}
