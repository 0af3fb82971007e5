//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Endpoints that query
//! an instance add the request's diagnostics under `meta`.

use castormon_db::Diagnostics;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": T, "meta": { "queries", "elapsed_ms", "connected_to" } }`.
#[derive(Debug, Serialize)]
pub struct DiagnosedResponse<T: Serialize> {
    pub data: T,
    pub meta: Diagnostics,
}
