//! Dynamic plugin loading.
//!
//! The bundle wire format: a package directory holds a `module.json`
//! manifest plus a cdylib exporting a `PLUGIN_DECLARATION` static (see
//! [`PluginDeclaration`] and the `declare_plugin!` macro). The loader opens
//! the library with `libloading`, checks the declared API version for caret
//! compatibility with the host, instantiates the plugin, and validates the
//! identity contract.

use std::path::Path;

use libloading::Library;
use semver::{Version, VersionReq};

use crate::kernel::constants;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;

/// Static exported by every plugin cdylib.
///
/// `api_version` is the core API version the plugin was compiled against;
/// `create` produces a fresh boxed instance.
pub struct PluginDeclaration {
    pub api_version: &'static str,
    pub create: fn() -> Box<dyn Plugin>,
}

/// Export a [`PluginDeclaration`] from a plugin crate.
///
/// ```ignore
/// blacktop_core::declare_plugin!(WeatherFeedPlugin::boxed);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($create:path) => {
        #[no_mangle]
        pub static PLUGIN_DECLARATION: $crate::plugin_system::loader::PluginDeclaration =
            $crate::plugin_system::loader::PluginDeclaration {
                api_version: $crate::kernel::constants::API_VERSION,
                create: $create,
            };
    };
}

/// Read a declaration static out of an opened library.
///
/// # Safety
/// The caller must ensure the library actually exports `symbol` as a static
/// of type `T`, and that the returned reference is not used after the library
/// is dropped.
pub(crate) unsafe fn raw_declaration<'lib, T>(
    library: &'lib Library,
    symbol: &[u8],
    plugin_id: &str,
    path: &Path,
) -> Result<&'lib T, PluginSystemError> {
    let decl = unsafe { library.get::<*const T>(symbol) }.map_err(|e| {
        PluginSystemError::Loading {
            plugin_id: plugin_id.to_string(),
            path: Some(path.to_path_buf()),
            message: format!("missing declaration symbol: {}", e),
        }
    })?;
    let ptr: *const T = *decl;
    if ptr.is_null() {
        return Err(PluginSystemError::Loading {
            plugin_id: plugin_id.to_string(),
            path: Some(path.to_path_buf()),
            message: "declaration symbol is null".to_string(),
        });
    }
    Ok(unsafe { &*ptr })
}

/// Whether a plugin compiled against `declared` can run on host API `host`
/// (caret semantics on the declared version).
pub(crate) fn api_compatible(declared: &Version, host: &Version) -> bool {
    match VersionReq::parse(&format!("^{}", declared)) {
        Ok(req) => req.matches(host),
        Err(_) => false,
    }
}

/// Loads plugin libraries and enforces the interface contract.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    host_api: Version,
}

impl PluginLoader {
    pub fn new() -> Result<Self, PluginSystemError> {
        let host_api = Version::parse(constants::API_VERSION)?;
        Ok(Self { host_api })
    }

    pub fn host_api(&self) -> &Version {
        &self.host_api
    }

    /// Load a plugin from a cdylib at `library_path`.
    ///
    /// Returns the instance together with the mapped library; the caller
    /// must keep the library alive for as long as the instance exists.
    pub fn load_dynamic(
        &self,
        plugin_id: &str,
        library_path: &Path,
    ) -> Result<(Box<dyn Plugin>, Library), PluginSystemError> {
        let library = unsafe { Library::new(library_path) }.map_err(|e| {
            PluginSystemError::Loading {
                plugin_id: plugin_id.to_string(),
                path: Some(library_path.to_path_buf()),
                message: format!("failed to open library: {}", e),
            }
        })?;

        let instance = {
            let declaration: &PluginDeclaration = unsafe {
                raw_declaration(
                    &library,
                    constants::PLUGIN_DECLARATION_SYMBOL,
                    plugin_id,
                    library_path,
                )
            }?;
            self.check_api(plugin_id, declaration.api_version)?;
            (declaration.create)()
        };

        self.validate_contract(plugin_id, instance.as_ref())?;
        Ok((instance, library))
    }

    fn check_api(&self, plugin_id: &str, declared: &str) -> Result<(), PluginSystemError> {
        let declared_version = Version::parse(declared)?;
        if !api_compatible(&declared_version, &self.host_api) {
            return Err(PluginSystemError::ApiIncompatible {
                plugin_id: plugin_id.to_string(),
                declared: declared.to_string(),
                host: self.host_api.to_string(),
            });
        }
        Ok(())
    }

    /// Validate the identity contract: every required member present and
    /// non-empty, version parseable, declared id matching the resolved id.
    /// The first missing member is the one reported.
    pub fn validate_contract(
        &self,
        expected_id: &str,
        plugin: &dyn Plugin,
    ) -> Result<(), PluginSystemError> {
        let required = [
            ("id", plugin.id()),
            ("name", plugin.name()),
            ("version", plugin.version()),
            ("description", plugin.description()),
            ("author", plugin.author()),
        ];
        for (member, value) in required {
            if value.trim().is_empty() {
                return Err(PluginSystemError::Validation {
                    plugin_id: expected_id.to_string(),
                    missing: member.to_string(),
                });
            }
        }
        Version::parse(plugin.version())?;
        if plugin.id() != expected_id {
            return Err(PluginSystemError::IdentityMismatch {
                plugin_id: expected_id.to_string(),
                declared: plugin.id().to_string(),
            });
        }
        Ok(())
    }
}
