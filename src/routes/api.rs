use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// API Router Module
///
/// JSON endpoints under `/api`. The edge gate skips this prefix entirely; the
/// handlers resolve the session themselves and never redirect.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        .route("/api/health", get(handlers::health))
        // GET /api/session
        // Resolved identity for the caller's credential.
        .route("/api/session", get(handlers::get_session))
        // POST /api/session/logout
        // Invalidates the memoized identity and clears the cookie.
        .route("/api/session/logout", post(handlers::logout))
        // GET /api/session/landing?redirect=...
        // Post-login destination, honoring a recovered redirect when the role allows it.
        .route("/api/session/landing", get(handlers::get_landing))
}
