use crate::{AppState, guard::{UserOnly, enforce_role}, handlers};
use axum::{Router, middleware, routing::get};

/// User Router Module
///
/// Pages owned by the `USER` role. Every route is wrapped in the user-only
/// role guard, which re-checks the fully resolved identity after the edge gate
/// has already confirmed a credential is present.
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // Standard landing page for authenticated users.
        .route("/dashboard", get(handlers::guarded_page))
        // GET /dashboard/{*section}
        // Any nested dashboard page (profile, history, ...).
        .route("/dashboard/{*section}", get(handlers::guarded_page))
        .route_layer(middleware::from_fn_with_state(
            state,
            enforce_role::<UserOnly>,
        ))
}
