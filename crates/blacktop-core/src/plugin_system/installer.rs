//! Plugin package installation.
//!
//! [`PluginInstaller`] is the seam to the external package mechanism;
//! [`DirectoryInstaller`] implements it over a plugin directory on disk.
//! Trust is best-effort: sources failing the allow-list check are logged and
//! recorded, never blocked. Cryptographic signature verification is a known
//! gap; install records carry [`SignatureStatus::Unverified`] until it lands.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::metadata::{read_manifest, ModuleMetadata};

pub const MANIFEST_FILE: &str = "module.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    /// No signature was checked. Verification is deferred work.
    Unverified,
}

/// Durable record of one install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRecord {
    pub id: String,
    pub version: String,
    pub source: String,
    pub trusted: bool,
    pub signature: SignatureStatus,
    pub installed_at: DateTime<Utc>,
}

/// External package-installation mechanism.
#[async_trait]
pub trait PluginInstaller: Send + Sync + Debug {
    /// Install the package identified by `spec` (a source path or locator).
    async fn install(
        &self,
        spec: &str,
        version: Option<&str>,
    ) -> Result<InstallRecord, PluginSystemError>;

    /// Resolve an installed package id to its package directory.
    fn resolve(&self, id: &str) -> Result<PathBuf, PluginSystemError>;

    /// Remove an installed package's files. Removing an absent package is a
    /// no-op.
    async fn remove(&self, id: &str) -> Result<(), PluginSystemError>;
}

/// Installer copying package directories into a configured plugin directory.
#[derive(Debug, Clone)]
pub struct DirectoryInstaller {
    plugin_dir: PathBuf,
    trusted_sources: Vec<String>,
}

impl DirectoryInstaller {
    pub fn new(plugin_dir: PathBuf, trusted_sources: Vec<String>) -> Self {
        Self {
            plugin_dir,
            trusted_sources,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Best-effort trusted-source check: substring match against the
    /// allow-list. An empty allow-list trusts everything.
    pub fn is_trusted(&self, source: &str) -> bool {
        if self.trusted_sources.is_empty() {
            return true;
        }
        self.trusted_sources.iter().any(|t| source.contains(t.as_str()))
    }

    /// Signature verification is not implemented; see the install record.
    pub fn verify_signature(&self, _package_dir: &Path) -> SignatureStatus {
        SignatureStatus::Unverified
    }

    fn install_error(spec: &str, message: String, source: Option<std::io::Error>) -> PluginSystemError {
        PluginSystemError::Install {
            spec: spec.to_string(),
            message,
            source,
        }
    }
}

fn copy_dir_all(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl PluginInstaller for DirectoryInstaller {
    async fn install(
        &self,
        spec: &str,
        version: Option<&str>,
    ) -> Result<InstallRecord, PluginSystemError> {
        let source_dir = PathBuf::from(spec);
        if !source_dir.is_dir() {
            return Err(Self::install_error(
                spec,
                "package source is not a directory".to_string(),
                None,
            ));
        }

        let manifest: ModuleMetadata = read_manifest(&source_dir.join(MANIFEST_FILE))?;
        if let Some(requested) = version {
            if manifest.version != requested {
                return Err(Self::install_error(
                    spec,
                    format!(
                        "requested version {} but package provides {}",
                        requested, manifest.version
                    ),
                    None,
                ));
            }
        }

        let trusted = self.is_trusted(spec);
        if !trusted {
            log::warn!(
                "plugin '{}' from '{}' failed the trusted-source check; installing anyway",
                manifest.id,
                spec
            );
        }
        let signature = self.verify_signature(&source_dir);

        let target_dir = self.plugin_dir.join(&manifest.id);
        copy_dir_all(&source_dir, &target_dir).map_err(|e| {
            Self::install_error(spec, "failed to copy package files".to_string(), Some(e))
        })?;

        Ok(InstallRecord {
            id: manifest.id,
            version: manifest.version,
            source: spec.to_string(),
            trusted,
            signature,
            installed_at: Utc::now(),
        })
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, PluginSystemError> {
        let package_dir = self.plugin_dir.join(id);
        if package_dir.join(MANIFEST_FILE).is_file() {
            Ok(package_dir)
        } else {
            Err(PluginSystemError::NotInstalled {
                plugin_id: id.to_string(),
            })
        }
    }

    async fn remove(&self, id: &str) -> Result<(), PluginSystemError> {
        let package_dir = self.plugin_dir.join(id);
        if !package_dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&package_dir).map_err(|e| PluginSystemError::Install {
            spec: id.to_string(),
            message: "failed to remove package files".to_string(),
            source: Some(e),
        })
    }
}
