use axum::routing::get;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Report routes mounted at `/reports`.
///
/// ```text
/// GET       /        -> list_reports
/// GET|POST  /{key}   -> get_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(reports::list_reports))
        .route("/{key}", get(reports::get_report).post(reports::get_report))
}
