//! HTTP surface for the plugin manager.
//!
//! Every route responds with the uniform envelope from [`envelope`]; service
//! errors map to 400, unknown ids on the detail route to 404, and anything
//! unexpected to 500.

pub mod envelope;
pub mod handlers;

#[cfg(test)]
mod tests;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::messaging::service::MessagingService;
use crate::plugin_system::manager::PluginManager;

pub use envelope::{ApiResponse, Envelope};

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub manager: PluginManager,
    pub messaging: MessagingService,
}

/// Build the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/plugins", get(handlers::list_plugins))
        .route("/api/plugins/stats", get(handlers::plugin_stats))
        .route("/api/plugins/search", get(handlers::search_plugins))
        .route("/api/plugins/:id", get(handlers::plugin_detail))
        .route("/api/plugins/:id", delete(handlers::uninstall_plugin))
        .route("/api/plugins/:id/install", post(handlers::install_plugin))
        .route("/api/plugins/:id/load", post(handlers::load_plugin))
        .route("/api/plugins/:id/unload", post(handlers::unload_plugin))
        .route("/api/plugins/:id/enable", post(handlers::enable_plugin))
        .route("/api/plugins/:id/disable", post(handlers::disable_plugin))
        .with_state(state)
}
