use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Common Router Module
///
/// Pages any authenticated role may open. No role guard: the edge gate's
/// credential check is the whole enforcement.
pub fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/my-profile", get(handlers::common_page))
        .route("/settings", get(handlers::common_page))
}
