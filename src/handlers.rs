use axum::{
    Json,
    extract::{OriginalUri, Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};

use crate::{
    auth::{CurrentSession, RequireIdentity},
    classifier::categorize,
    config::AppConfig,
    identity::IdentityState,
    models::{LandingResponse, PageView, RedirectParams, ResolvedIdentity, SessionSnapshot},
    policy::{LOGIN_PATH, post_login_destination},
};

// --- API Handlers ---

/// health
///
/// Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_session
///
/// Resolves the caller's credential into a session snapshot. This is the
/// identity collaborator client pages poll while their guard is resolving.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Resolved session", body = SessionSnapshot))
)]
pub async fn get_session(session: CurrentSession) -> Json<SessionSnapshot> {
    Json(SessionSnapshot::from_identity(session.identity))
}

/// logout
///
/// Drops the memoized identity for the caller's credential and expires the
/// session cookie. Guards mounted for that session re-enter resolution.
#[utoipa::path(
    post,
    path = "/api/session/logout",
    responses((status = 200, description = "Session cleared", body = SessionSnapshot))
)]
pub async fn logout(
    State(config): State<AppConfig>,
    State(identity_store): State<IdentityState>,
    session: CurrentSession,
) -> impl IntoResponse {
    // 1. Drop the memoized identity so no guard reuses it.
    if let Some(token) = &session.token {
        identity_store.invalidate(token);
    }

    // 2. Expire the session cookie on the client.
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.session_cookie
    );

    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SessionSnapshot::from_identity(None)),
    )
}

/// get_landing
///
/// Post-login destination for the caller: the recovered `redirect` when it is
/// valid for the caller's role, otherwise the role's dashboard. Anonymous
/// callers are pointed back at the login page.
#[utoipa::path(
    get,
    path = "/api/session/landing",
    params(RedirectParams),
    responses((status = 200, description = "Where to navigate next", body = LandingResponse))
)]
pub async fn get_landing(
    session: CurrentSession,
    Query(params): Query<RedirectParams>,
) -> Json<LandingResponse> {
    // Only a resolved identity can honor the recovered destination.
    let destination = match session.identity {
        Some(identity) => post_login_destination(params.redirect.as_deref(), identity.role),
        None => LOGIN_PATH.to_string(),
    };

    Json(LandingResponse { destination })
}

// --- Page Handlers ---
// Stand-ins for the host application's pages. They run only after the edge
// gate (and, where mounted, a role guard) admitted the request.

/// Public and auth-only pages.
pub async fn open_page(OriginalUri(uri): OriginalUri) -> Json<PageView> {
    Json(page_view(uri.path(), None))
}

/// Pages behind a role guard; the guard supplies the identity.
pub async fn guarded_page(
    OriginalUri(uri): OriginalUri,
    RequireIdentity(identity): RequireIdentity,
) -> Json<PageView> {
    Json(page_view(uri.path(), Some(identity)))
}

/// Pages open to any authenticated role. Only the edge gate stands in front of
/// them, so the viewer is resolved here and may be absent for a stale credential.
pub async fn common_page(OriginalUri(uri): OriginalUri, session: CurrentSession) -> Json<PageView> {
    Json(page_view(uri.path(), session.identity))
}

fn page_view(path: &str, viewer: Option<ResolvedIdentity>) -> PageView {
    PageView {
        path: path.to_string(),
        category: categorize(path),
        viewer,
    }
}
