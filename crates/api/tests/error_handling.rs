//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server runs.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use castormon_api::error::AppError;
use castormon_core::error::CoreError;
use castormon_db::DbError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::Configuration maps to 400 with CONFIGURATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn configuration_error_returns_400() {
    let err = AppError::Core(CoreError::Configuration("unknown instance 'c2cms'".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "CONFIGURATION_ERROR");
    assert_eq!(json["error"], "unknown instance 'c2cms'");
}

// ---------------------------------------------------------------------------
// Test: CoreError::InvalidInput maps to 400 with INVALID_QUERY_PARAMETERS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_input_returns_400() {
    let err = AppError::Core(CoreError::invalid("from must be earlier than to"));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_QUERY_PARAMETERS");
    assert_eq!(
        json["error"],
        "Invalid query parameters: from must be earlier than to"
    );
}

// ---------------------------------------------------------------------------
// Test: a driver connection failure maps to 503 with CONNECTION_ERROR
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_failure_returns_503() {
    let err = AppError::from(DbError::Connection("ORA-12541: TNS:no listener".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "CONNECTION_ERROR");
    assert_eq!(json["error"], "Database unavailable: ORA-12541: TNS:no listener");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Query maps to 502 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_error_returns_502_and_sanitizes_message() {
    let err = AppError::Core(CoreError::Query("Table 'dlf.dlf_messages' doesn't exist".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "QUERY_ERROR");
    assert!(!json["error"].as_str().unwrap().contains("dlf_messages"));
}

// ---------------------------------------------------------------------------
// Test: AppError::InternalError maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("secret database credentials leaked".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: AppError::NotFound maps to 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_returns_404() {
    let err = AppError::NotFound("unknown report 'x'".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
