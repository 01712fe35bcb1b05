//! Component resolution: turning a catalog entry into a live component.
//!
//! [`LocalFactoryResolver`] serves statically bundled modules from
//! registered factories. [`BundleResolver`] fetches a component bundle
//! (remote `repository` URL or a conventional per-id path under the bundle
//! directory), loads it through `libloading`, and falls back to the local
//! factories when the bundle path fails.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use libloading::Library;
use semver::Version;
use tokio::sync::Mutex;

use crate::kernel::constants;
use crate::module_store::component::{ComponentDeclaration, ComponentFactory, ModuleComponent};
use crate::module_store::error::ModuleStoreError;
use crate::plugin_system::loader::{api_compatible, raw_declaration};
use crate::plugin_system::metadata::ModuleMetadata;

/// A resolved component together with the mapped bundle library, when the
/// component came out of one. The library must outlive the component.
pub struct ResolvedComponent {
    pub component: Arc<dyn ModuleComponent>,
    pub library: Option<Library>,
}

/// Strategy turning catalog metadata into a live component.
#[async_trait]
pub trait ComponentResolver: Send + Sync + Debug {
    async fn resolve(
        &self,
        metadata: &ModuleMetadata,
    ) -> Result<ResolvedComponent, ModuleStoreError>;
}

/// Resolver over factories registered in-process, keyed by module id.
#[derive(Clone, Default)]
pub struct LocalFactoryResolver {
    factories: Arc<Mutex<HashMap<String, ComponentFactory>>>,
}

impl Debug for LocalFactoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFactoryResolver").finish_non_exhaustive()
    }
}

impl LocalFactoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a module id, replacing any existing one.
    pub async fn register(&self, module_id: &str, factory: ComponentFactory) {
        self.factories
            .lock()
            .await
            .insert(module_id.to_string(), factory);
    }

    pub async fn contains(&self, module_id: &str) -> bool {
        self.factories.lock().await.contains_key(module_id)
    }
}

#[async_trait]
impl ComponentResolver for LocalFactoryResolver {
    async fn resolve(
        &self,
        metadata: &ModuleMetadata,
    ) -> Result<ResolvedComponent, ModuleStoreError> {
        let factory = {
            let factories = self.factories.lock().await;
            factories.get(&metadata.id).cloned()
        };
        match factory {
            Some(factory) => Ok(ResolvedComponent {
                component: factory(),
                library: None,
            }),
            None => Err(ModuleStoreError::Resolve {
                module_id: metadata.id.clone(),
                message: "no local factory registered".to_string(),
            }),
        }
    }
}

/// Resolver loading component bundles from disk, fetching remote bundles
/// on demand, with local factories as the fallback.
pub struct BundleResolver {
    bundle_dir: PathBuf,
    client: reqwest::Client,
    host_api: Version,
    fallback: LocalFactoryResolver,
}

impl Debug for BundleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleResolver")
            .field("bundle_dir", &self.bundle_dir)
            .finish_non_exhaustive()
    }
}

impl BundleResolver {
    pub fn new(
        bundle_dir: PathBuf,
        fallback: LocalFactoryResolver,
    ) -> Result<Self, ModuleStoreError> {
        let host_api = Version::parse(constants::API_VERSION)
            .map_err(|e| ModuleStoreError::Internal(format!("bad host api version: {}", e)))?;
        Ok(Self {
            bundle_dir,
            client: reqwest::Client::new(),
            host_api,
            fallback,
        })
    }

    fn bundle_path(&self, metadata: &ModuleMetadata) -> PathBuf {
        self.bundle_dir.join(&metadata.id).join(metadata.library_file())
    }

    /// Download the bundle library from the module's repository URL.
    async fn fetch_bundle(
        &self,
        metadata: &ModuleMetadata,
        url: &str,
        target: &PathBuf,
    ) -> Result<(), ModuleStoreError> {
        let fetch_err = |message: String| ModuleStoreError::Fetch {
            module_id: metadata.id.clone(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_err(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fetch_err(format!("failed to create bundle dir: {}", e)))?;
        }
        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| fetch_err(format!("failed to write bundle: {}", e)))?;
        log::info!(
            "fetched bundle for module '{}' ({} bytes) from {}",
            metadata.id,
            bytes.len(),
            url
        );
        Ok(())
    }

    fn load_bundle(
        &self,
        metadata: &ModuleMetadata,
        path: &PathBuf,
    ) -> Result<ResolvedComponent, ModuleStoreError> {
        let resolve_err = |message: String| ModuleStoreError::Resolve {
            module_id: metadata.id.clone(),
            message,
        };

        let library = unsafe { Library::new(path) }
            .map_err(|e| resolve_err(format!("failed to open bundle: {}", e)))?;
        let component = {
            let declaration: &ComponentDeclaration = unsafe {
                raw_declaration(
                    &library,
                    constants::COMPONENT_DECLARATION_SYMBOL,
                    &metadata.id,
                    path,
                )
            }
            .map_err(|e| resolve_err(e.to_string()))?;

            let declared = Version::parse(declaration.api_version)
                .map_err(|e| resolve_err(format!("bad bundle api version: {}", e)))?;
            if !api_compatible(&declared, &self.host_api) {
                return Err(resolve_err(format!(
                    "bundle api {} is incompatible with host {}",
                    declared, self.host_api
                )));
            }
            (declaration.create)()
        };
        Ok(ResolvedComponent {
            component,
            library: Some(library),
        })
    }

    async fn resolve_bundle(
        &self,
        metadata: &ModuleMetadata,
    ) -> Result<ResolvedComponent, ModuleStoreError> {
        let path = self.bundle_path(metadata);
        if !path.is_file() {
            match &metadata.repository {
                Some(url) => self.fetch_bundle(metadata, url, &path).await?,
                None => {
                    return Err(ModuleStoreError::Resolve {
                        module_id: metadata.id.clone(),
                        message: "no bundle on disk and no repository to fetch from".to_string(),
                    })
                }
            }
        }
        self.load_bundle(metadata, &path)
    }
}

#[async_trait]
impl ComponentResolver for BundleResolver {
    async fn resolve(
        &self,
        metadata: &ModuleMetadata,
    ) -> Result<ResolvedComponent, ModuleStoreError> {
        match self.resolve_bundle(metadata).await {
            Ok(resolved) => Ok(resolved),
            Err(bundle_err) => {
                log::warn!(
                    "bundle resolution failed for module '{}', trying local factory: {}",
                    metadata.id,
                    bundle_err
                );
                self.fallback.resolve(metadata).await.map_err(|_| bundle_err)
            }
        }
    }
}
