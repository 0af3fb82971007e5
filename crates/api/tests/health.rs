//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use castormon_core::dialect::Dialect;
use castormon_db::MemoryExecutor;
use common::{body_json, get, mysql_executor};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = common::build_test_app_with_executors(&[
        ("c2public", mysql_executor()),
        ("c2atlas", Arc::new(MemoryExecutor::new(Dialect::Oracle))),
    ]);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(
        json["instances"],
        json!([
            {"name": "c2public", "reachable": true},
            {"name": "c2atlas", "reachable": true}
        ])
    );
}

// ---------------------------------------------------------------------------
// Test: an unreachable instance degrades the health status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_instance_degrades_health() {
    let app = common::build_test_app_with_executors(&[
        ("c2public", mysql_executor()),
        ("c2atlas", Arc::new(MemoryExecutor::unreachable(Dialect::Oracle))),
    ]);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["instances"][0]["reachable"], true);
    assert_eq!(json["instances"][1]["reachable"], false);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(mysql_executor());
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(mysql_executor());
    let response = get(app, "/api/v1/instances").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: instance listing never includes passwords
// ---------------------------------------------------------------------------

#[tokio::test]
async fn instances_are_listed_without_passwords() {
    let app = common::build_test_app(mysql_executor());
    let response = get(app, "/api/v1/instances").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let instances = json["data"].as_array().unwrap();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0]["name"], "c2public");
    assert_eq!(instances[0]["type"], "mysql");
    assert_eq!(instances[1]["type"], "oracle");
    assert!(!json.to_string().contains("secret"));
}

// ---------------------------------------------------------------------------
// Test: instance status reports the server version
// ---------------------------------------------------------------------------

#[tokio::test]
async fn instance_status_reports_version() {
    let app = common::build_test_app(mysql_executor());
    let response = get(app, "/api/v1/instances/c2public/status").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "c2public");
    assert_eq!(json["data"]["server_version"], "mysql (in-memory)");
    assert_eq!(json["meta"]["queries"], 1);
    assert_eq!(json["meta"]["connected_to"], "dlf_reader@dlfdb.example.org/dlf");
}
