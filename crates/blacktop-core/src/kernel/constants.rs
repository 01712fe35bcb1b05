/// Application name
pub const APP_NAME: &str = "Blacktop Blackout";

/// Application version
pub const APP_VERSION: &str = "0.1.0";

/// Current plugin API version. Plugin declarations must be caret-compatible
/// with this value to load.
pub const API_VERSION: &str = "0.1.0";

/// Default plugins directory (relative to the data dir)
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Default directory for fetched component bundles
pub const DEFAULT_BUNDLES_DIR: &str = "bundles";

/// Default per-topic message history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default request/response timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Key under which the terminology preference is persisted
pub const TERMINOLOGY_KEY: &str = "preferences.terminology";

/// Key prefix for install records
pub const INSTALL_RECORD_PREFIX: &str = "installs";

/// Exported symbol every plugin cdylib must provide
pub const PLUGIN_DECLARATION_SYMBOL: &[u8] = b"PLUGIN_DECLARATION";

/// Exported symbol every component bundle must provide
pub const COMPONENT_DECLARATION_SYMBOL: &[u8] = b"COMPONENT_DECLARATION";
