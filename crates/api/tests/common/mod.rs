#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use castormon_core::dialect::Dialect;
use castormon_core::instance::parse_instances;
use castormon_db::{InstanceRegistry, MemoryExecutor};
use http_body_util::BodyExt;
use tower::ServiceExt;

use castormon_api::config::ServerConfig;
use castormon_api::router::build_app_router;
use castormon_api::state::AppState;

/// Two instances: a MySQL one and an Oracle one. Tests install in-memory
/// executors for the instances they query.
pub const INSTANCES: &str = r#"{
    "c2public": {
        "type": "mysql",
        "server": "dlfdb.example.org",
        "username": "dlf_reader",
        "password": "secret",
        "database": "dlf",
        "schema": "castormon"
    },
    "c2atlas": {
        "type": "oracle",
        "server": "atlasdb",
        "port": 1521,
        "username": "dlf",
        "password": "secret",
        "database": "DLF_ATLAS",
        "schema": "mon"
    }
}"#;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        drilldown_hours: 1,
        default_page_size: 500,
        report_cache_ttl_secs: 60,
        instances_file: PathBuf::from("instances.json"),
    }
}

pub fn test_registry() -> InstanceRegistry {
    InstanceRegistry::new(parse_instances(INSTANCES).unwrap())
}

/// Build the full application router, answering `c2public` queries from
/// `executor`.
pub fn build_test_app(executor: Arc<MemoryExecutor>) -> Router {
    build_test_app_with(executor, test_config())
}

pub fn build_test_app_with(executor: Arc<MemoryExecutor>, config: ServerConfig) -> Router {
    let registry = test_registry();
    registry.insert_executor("c2public", executor);
    build_app_router(AppState::new(registry, config.clone()), &config)
}

/// Same, with the executor installed for `c2atlas` (Oracle) instead.
pub fn build_oracle_test_app(executor: Arc<MemoryExecutor>) -> Router {
    build_test_app_with_executors(&[("c2atlas", executor)])
}

/// One in-memory executor per named instance.
pub fn build_test_app_with_executors(executors: &[(&str, Arc<MemoryExecutor>)]) -> Router {
    let config = test_config();
    let registry = test_registry();
    for (name, executor) in executors {
        let executor: Arc<MemoryExecutor> = Arc::clone(executor);
        registry.insert_executor(name, executor);
    }
    build_app_router(AppState::new(registry, config.clone()), &config)
}

pub fn mysql_executor() -> Arc<MemoryExecutor> {
    Arc::new(MemoryExecutor::new(Dialect::MySql))
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// POST a form-encoded body.
pub async fn post_form(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
