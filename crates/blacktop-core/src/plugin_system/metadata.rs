use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plugin_system::error::PluginSystemError;

/// Kind of module a metadata entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    /// Server-side plugin loaded by the plugin manager
    Backend,
    /// UI module loaded by the client module store
    FrontendUi,
    /// Built-in module shipped with the console
    Core,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::Backend => write!(f, "backend"),
            ModuleType::FrontendUi => write!(f, "frontend-ui"),
            ModuleType::Core => write!(f, "core"),
        }
    }
}

impl FromStr for ModuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backend" => Ok(ModuleType::Backend),
            "frontend-ui" => Ok(ModuleType::FrontendUi),
            "core" => Ok(ModuleType::Core),
            other => Err(format!("unknown module type: {}", other)),
        }
    }
}

/// How a module is priced in the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingModel {
    Free,
    Paid,
    Subscription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub model: PricingModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Billing period for subscriptions, e.g. "monthly"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

impl Pricing {
    pub fn free() -> Self {
        Self {
            model: PricingModel::Free,
            price: None,
            currency: None,
            period: None,
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::free()
    }
}

/// Describes a module known to the console.
///
/// `id` is the only stable identity; the rest of the metadata can be replaced
/// wholesale on re-registration without disturbing a live instance. The serde
/// form doubles as the on-disk `module.json` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Unique identifier for the module
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(rename = "type")]
    pub module_type: ModuleType,

    /// Semantic version string
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub installed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Remote bundle location, when the module is fetched rather than bundled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default)]
    pub pricing: Pricing,

    /// Library file inside the package, defaulting to the platform name
    /// derived from the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl ModuleMetadata {
    /// Create a new metadata entry with the required identity fields.
    pub fn new(id: &str, name: &str, module_type: ModuleType, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            module_type,
            version: version.to_string(),
            description: String::new(),
            author: String::new(),
            category: String::new(),
            tags: BTreeSet::new(),
            enabled: false,
            installed: false,
            size_bytes: None,
            repository: None,
            homepage: None,
            license: None,
            pricing: Pricing::free(),
            entry_point: None,
            last_updated: Utc::now(),
        }
    }

    /// Check the entry is well-formed: non-empty id and a parseable version.
    pub fn validate(&self) -> Result<(), PluginSystemError> {
        if self.id.trim().is_empty() {
            return Err(PluginSystemError::Validation {
                plugin_id: self.id.clone(),
                missing: "id".to_string(),
            });
        }
        semver::Version::parse(&self.version)?;
        Ok(())
    }

    /// Case-insensitive substring match against name, description, or any tag.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    /// The library file name this module's package is expected to contain.
    pub fn library_file(&self) -> String {
        self.entry_point
            .clone()
            .unwrap_or_else(|| default_library_name(&self.id))
    }
}

/// Platform library name derived from a module id (`weather` ->
/// `libweather.so` on Linux).
pub fn default_library_name(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c == '-' || c == '.' { '_' } else { c })
        .collect();
    #[cfg(target_os = "macos")]
    {
        format!("lib{}.dylib", stem)
    }
    #[cfg(target_os = "windows")]
    {
        format!("{}.dll", stem)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        format!("lib{}.so", stem)
    }
}

/// Read and validate a `module.json` manifest.
pub fn read_manifest(path: &Path) -> Result<ModuleMetadata, PluginSystemError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PluginSystemError::Manifest {
        path: path.to_path_buf(),
        message: "failed to read manifest".to_string(),
        source: Some(Box::new(e)),
    })?;
    let metadata: ModuleMetadata =
        serde_json::from_str(&raw).map_err(|e| PluginSystemError::Manifest {
            path: path.to_path_buf(),
            message: "failed to parse manifest".to_string(),
            source: Some(Box::new(e)),
        })?;
    metadata.validate()?;
    Ok(metadata)
}

/// Partial update applied by `updatePluginMetadata`. Absent fields keep the
/// current value; `last_updated` is stamped on apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub enabled: Option<bool>,
    pub installed: Option<bool>,
    pub size_bytes: Option<u64>,
    pub repository: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub pricing: Option<Pricing>,
    pub entry_point: Option<String>,
}

impl MetadataPatch {
    pub fn apply(self, metadata: &mut ModuleMetadata) {
        if let Some(name) = self.name {
            metadata.name = name;
        }
        if let Some(version) = self.version {
            metadata.version = version;
        }
        if let Some(description) = self.description {
            metadata.description = description;
        }
        if let Some(author) = self.author {
            metadata.author = author;
        }
        if let Some(category) = self.category {
            metadata.category = category;
        }
        if let Some(tags) = self.tags {
            metadata.tags = tags;
        }
        if let Some(enabled) = self.enabled {
            metadata.enabled = enabled;
        }
        if let Some(installed) = self.installed {
            metadata.installed = installed;
        }
        if let Some(size_bytes) = self.size_bytes {
            metadata.size_bytes = Some(size_bytes);
        }
        if let Some(repository) = self.repository {
            metadata.repository = Some(repository);
        }
        if let Some(homepage) = self.homepage {
            metadata.homepage = Some(homepage);
        }
        if let Some(license) = self.license {
            metadata.license = Some(license);
        }
        if let Some(pricing) = self.pricing {
            metadata.pricing = pricing;
        }
        if let Some(entry_point) = self.entry_point {
            metadata.entry_point = Some(entry_point);
        }
        metadata.last_updated = Utc::now();
    }
}
