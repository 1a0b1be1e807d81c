use crate::{AppState, guard::{AdminOnly, enforce_role}, handlers};
use axum::{Router, middleware, routing::get};

/// Admin Router Module
///
/// Pages owned by the `ADMIN` role. The admin-only guard runs on every route
/// and sends non-admin callers to their own dashboard.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(handlers::guarded_page))
        // GET /admin/dashboard
        // Admin landing page.
        .route("/admin/dashboard", get(handlers::guarded_page))
        .route("/admin/{*section}", get(handlers::guarded_page))
        .route_layer(middleware::from_fn_with_state(
            state,
            enforce_role::<AdminOnly>,
        ))
}
