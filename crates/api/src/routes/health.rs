use std::time::Duration;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use castormon_db::DbError;
use serde::Serialize;

use crate::state::AppState;

/// How long one instance may take to answer the health check.
const INSTANCE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every instance answers, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub instances: Vec<InstanceHealth>,
}

#[derive(Serialize)]
pub struct InstanceHealth {
    pub name: String,
    /// Whether the instance reported its server version.
    pub reachable: bool,
}

/// GET /health -- returns service health and per-instance reachability.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut instances = Vec::with_capacity(state.registry.len());
    for name in state.registry.names() {
        let check = server_version(&state, name);
        let reachable = match tokio::time::timeout(INSTANCE_CHECK_TIMEOUT, check).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::warn!(instance = %name, error = %err, "Instance unreachable");
                false
            }
            Err(_) => {
                tracing::warn!(instance = %name, "Instance health check timed out");
                false
            }
        };
        instances.push(InstanceHealth {
            name: name.to_string(),
            reachable,
        });
    }

    let status = if instances.iter().all(|i| i.reachable) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        instances,
    })
}

async fn server_version(state: &AppState, name: &str) -> Result<String, DbError> {
    let mut ctx = state.registry.context(Some(name))?;
    ctx.server_version().await
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
