use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::envelope::ApiResponse;
use crate::api::AppState;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::metadata::ModuleType;

/// Map a plugin system error to its HTTP status.
///
/// Caller mistakes (wrong lifecycle state, bad package, failed contract) are
/// 400; everything else is a 500. Unknown-id on the info route is handled
/// separately as a 404.
fn error_status(error: &PluginSystemError) -> StatusCode {
    match error {
        PluginSystemError::Validation { .. }
        | PluginSystemError::IdentityMismatch { .. }
        | PluginSystemError::NotLoaded { .. }
        | PluginSystemError::AlreadyLoaded { .. }
        | PluginSystemError::NotInstalled { .. }
        | PluginSystemError::Install { .. }
        | PluginSystemError::Loading { .. }
        | PluginSystemError::ApiIncompatible { .. }
        | PluginSystemError::Manifest { .. }
        | PluginSystemError::VersionParsing(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(error: PluginSystemError) -> ApiResponse {
    ApiResponse::error(error_status(&error), error.to_string())
}

pub async fn list_plugins(State(state): State<AppState>) -> ApiResponse {
    let installed = state.manager.installed_plugins().await;
    let loaded = state.manager.loaded_plugins().await;
    let registry = state.manager.registry().lock().await.all();
    ApiResponse::ok(json!({
        "installed": installed,
        "loaded": loaded,
        "registry": registry,
    }))
}

pub async fn plugin_stats(State(state): State<AppState>) -> ApiResponse {
    let stats = state.manager.statistics().await;
    ApiResponse::ok(json!(stats))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub module_type: Option<String>,
}

pub async fn search_plugins(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResponse {
    let module_type = match params.module_type.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<ModuleType>() {
            Ok(t) => Some(t),
            Err(e) => return ApiResponse::error(StatusCode::BAD_REQUEST, e),
        },
    };
    let hits = state
        .manager
        .registry()
        .lock()
        .await
        .search(&params.q, module_type);
    ApiResponse::ok(json!({ "results": hits }))
}

pub async fn plugin_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse {
    let info = state.manager.plugin_info(&id).await;
    let metadata = state.manager.registry().lock().await.get(&id).cloned();
    if info.is_none() && metadata.is_none() {
        return ApiResponse::error(StatusCode::NOT_FOUND, format!("unknown plugin '{}'", id));
    }
    let is_loaded = info.is_some();
    ApiResponse::ok(json!({
        "info": info,
        "metadata": metadata,
        "is_loaded": is_loaded,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct InstallBody {
    pub version: Option<String>,
    /// Package source locator; defaults to the id in the path.
    pub source: Option<String>,
}

pub async fn install_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<InstallBody>>,
) -> ApiResponse {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let spec = body.source.unwrap_or_else(|| id.clone());
    match state.manager.install(&spec, body.version.as_deref()).await {
        Ok(record) => ApiResponse::ok(json!(record)),
        Err(e) => failure(e),
    }
}

pub async fn load_plugin(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    if state.manager.is_loaded(&id).await {
        return failure(PluginSystemError::AlreadyLoaded { plugin_id: id });
    }
    match state.manager.load(&id).await {
        Ok(info) => ApiResponse::ok(json!(info)),
        Err(e) => failure(e),
    }
}

pub async fn unload_plugin(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    match state.manager.unload(&id).await {
        Ok(()) => ApiResponse::ok_message(format!("plugin '{}' unloaded", id)),
        Err(e) => failure(e),
    }
}

pub async fn enable_plugin(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    match state.manager.enable(&id).await {
        Ok(()) => ApiResponse::ok_message(format!("plugin '{}' enabled", id)),
        Err(e) => failure(e),
    }
}

pub async fn disable_plugin(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    match state.manager.disable(&id).await {
        Ok(()) => ApiResponse::ok_message(format!("plugin '{}' disabled", id)),
        Err(e) => failure(e),
    }
}

pub async fn uninstall_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.manager.uninstall(&id).await {
        Ok(()) => ApiResponse::ok_message(format!("plugin '{}' uninstalled", id)),
        Err(e) => failure(e),
    }
}
