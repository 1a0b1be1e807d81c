use crate::{AppState, classifier::PUBLIC_ROUTES, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Registers every page on the public list. Auth-only pages (login, register,
/// forgot-password) are among them; the edge gate turns authenticated callers
/// away from those before the handler runs.
pub fn public_routes() -> Router<AppState> {
    PUBLIC_ROUTES
        .iter()
        .fold(Router::new(), |router, path| {
            router.route(path, get(handlers::open_page))
        })
}
