use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use castormon_core::error::CoreError;
use castormon_db::DbError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain and database errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `castormon_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A named resource (report key) that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        AppError::Core(err.into())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Configuration(msg) => {
                    (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR", msg.clone())
                }
                CoreError::Connection(msg) => {
                    tracing::warn!(error = %msg, "Database connection error");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "CONNECTION_ERROR",
                        format!("Database unavailable: {msg}"),
                    )
                }
                CoreError::InvalidInput(msg) => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_QUERY_PARAMETERS",
                    format!("Invalid query parameters: {msg}"),
                ),
                CoreError::Query(msg) => {
                    tracing::error!(error = %msg, "Query error");
                    (
                        StatusCode::BAD_GATEWAY,
                        "QUERY_ERROR",
                        "The database query failed".to_string(),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
