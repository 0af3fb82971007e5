pub mod dlf;
pub mod health;
pub mod instances;
pub mod reports;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /instances                     configured instances
/// /instances/{name}/status       server version of one instance
///
/// /dlf/lookups                   query form choice lists
/// /dlf/messages                  paginated log table
///
/// /reports                       report catalogue
/// /reports/{key}                 one report's chart data
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/instances", instances::router())
        .nest("/dlf", dlf::router())
        .nest("/reports", reports::router())
}
