use axum::routing::get;
use axum::Router;

use crate::handlers::instances;
use crate::state::AppState;

/// Instance routes mounted at `/instances`.
///
/// ```text
/// GET /                -> list_instances
/// GET /{name}/status   -> instance_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(instances::list_instances))
        .route("/{name}/status", get(instances::instance_status))
}
