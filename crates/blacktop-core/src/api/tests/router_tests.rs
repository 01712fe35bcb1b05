use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::tempdir;
use tower::util::ServiceExt;

use crate::api::{router, AppState};
use crate::messaging::service::MessagingService;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::installer::DirectoryInstaller;
use crate::plugin_system::manager::PluginManager;
use crate::plugin_system::traits::Plugin;
use crate::storage::manager::StorageManager;

struct StubPlugin;

#[async_trait]
impl Plugin for StubPlugin {
    fn id(&self) -> &str {
        "weather"
    }
    fn name(&self) -> &str {
        "Weather Feed"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "stub"
    }
    fn author(&self) -> &str {
        "tests"
    }
    async fn initialize(&self, _context: &PluginContext) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn destroy(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn enable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn disable(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
}

fn api_fixture() -> (Router, PluginManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let messaging = MessagingService::default();
    let storage = StorageManager::new(dir.path().join("data"));
    let installer = Arc::new(DirectoryInstaller::new(dir.path().join("plugins"), Vec::new()));
    let manager = PluginManager::new(messaging.clone(), storage, installer).unwrap();
    let app = router(AppState {
        manager: manager.clone(),
        messaging,
    });
    (app, manager, dir)
}

fn write_package(dir: &std::path::Path, id: &str) {
    fs::create_dir_all(dir).unwrap();
    let manifest = serde_json::json!({
        "id": id,
        "name": format!("{} plugin", id),
        "type": "backend",
        "version": "1.0.0",
        "author": "tests",
    });
    fs::write(dir.join("module.json"), manifest.to_string()).unwrap();
}

async fn envelope_of(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post(path: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(path);
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn list_plugins_returns_envelope() {
    let (app, _manager, _dir) = api_fixture();
    let response = app.oneshot(get("/api/plugins")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = envelope_of(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["installed"].is_array());
    assert!(body["data"]["loaded"].is_array());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn stats_route_reports_counts() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app.oneshot(get("/api/plugins/stats")).await.unwrap();
    let body = envelope_of(response).await;
    assert_eq!(body["data"]["loaded"], 1);
}

#[tokio::test]
async fn detail_of_unknown_plugin_is_404() {
    let (app, _manager, _dir) = api_fixture();
    let response = app.oneshot(get("/api/plugins/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = envelope_of(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn detail_of_loaded_plugin_includes_info() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app.oneshot(get("/api/plugins/weather")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = envelope_of(response).await;
    assert_eq!(body["data"]["is_loaded"], true);
    assert_eq!(body["data"]["info"]["id"], "weather");
    assert_eq!(body["data"]["metadata"]["id"], "weather");
}

#[tokio::test]
async fn search_rejects_bad_type_filter() {
    let (app, _manager, _dir) = api_fixture();
    let response = app
        .oneshot(get("/api/plugins/search?q=weather&type=desktop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_filters_results() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app
        .oneshot(get("/api/plugins/search?q=weather&type=backend"))
        .await
        .unwrap();
    let body = envelope_of(response).await;
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn install_route_installs_from_source() {
    let (app, manager, dir) = api_fixture();
    let source = dir.path().join("incoming/weather");
    write_package(&source, "weather");

    let response = app
        .oneshot(post(
            "/api/plugins/weather/install",
            Some(serde_json::json!({ "source": source.to_str().unwrap() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = envelope_of(response).await;
    assert_eq!(body["data"]["id"], "weather");
    assert_eq!(manager.installed_plugins().await.len(), 1);
}

#[tokio::test]
async fn load_of_uninstalled_plugin_is_400() {
    let (app, _manager, _dir) = api_fixture();
    let response = app
        .oneshot(post("/api/plugins/ghost/load", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn load_of_already_loaded_plugin_is_400() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app
        .oneshot(post("/api/plugins/weather/load", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = envelope_of(response).await;
    assert!(body["error"].as_str().unwrap().contains("already loaded"));
}

#[tokio::test]
async fn unload_round_trip() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app
        .clone()
        .oneshot(post("/api/plugins/weather/unload", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!manager.is_loaded("weather").await);

    // A second unload finds nothing loaded.
    let response = app
        .oneshot(post("/api/plugins/weather/unload", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enable_and_disable_routes() {
    let (app, manager, _dir) = api_fixture();
    manager.load_instance(Box::new(StubPlugin)).await.unwrap();

    let response = app
        .clone()
        .oneshot(post("/api/plugins/weather/enable", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(manager.plugin_info("weather").await.unwrap().enabled);

    let response = app
        .oneshot(post("/api/plugins/weather/disable", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!manager.plugin_info("weather").await.unwrap().enabled);
}

#[tokio::test]
async fn delete_route_uninstalls() {
    let (app, manager, dir) = api_fixture();
    let source = dir.path().join("incoming/weather");
    write_package(&source, "weather");
    manager
        .install(source.to_str().unwrap(), None)
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/plugins/weather")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(manager.installed_plugins().await.is_empty());
}
