//! Handlers for the configured database instances.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use castormon_core::dialect::Dialect;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::{DataResponse, DiagnosedResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub dialect: Dialect,
    pub server_version: String,
}

/// GET /api/v1/instances
///
/// Configured instances without their credentials.
pub async fn list_instances(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.registry.summaries(),
    }))
}

/// GET /api/v1/instances/{name}/status
///
/// Connects to the instance and reports its server version.
pub async fn instance_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut ctx = state.registry.context(Some(&name))?;
    let server_version = ctx.server_version().await?;

    Ok(Json(DiagnosedResponse {
        data: InstanceStatus {
            name: ctx.instance().to_string(),
            dialect: ctx.dialect(),
            server_version,
        },
        meta: ctx.diagnostics(),
    }))
}
