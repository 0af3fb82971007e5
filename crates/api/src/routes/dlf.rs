use axum::routing::get;
use axum::Router;

use crate::handlers::dlf;
use crate::state::AppState;

/// Log viewer routes mounted at `/dlf`.
///
/// ```text
/// GET       /lookups    -> lookups
/// GET|POST  /messages   -> messages
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lookups", get(dlf::lookups))
        .route("/messages", get(dlf::messages).post(dlf::messages))
}
