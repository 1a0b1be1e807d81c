use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use route_authz::{
    AppConfig, AppState, IdentityStore,
    auth::MockIdentityResolver,
    create_router,
    guard::{
        AdminGuard, AdminOnly, GuardState, GuardView, LOGIN_REQUIRED_MESSAGE, NOTICE_COOKIE,
        RoleRequirement, UserGuard, UserOnly,
    },
    models::{Notice, PageView, ResolvedIdentity, Role, RouteCategory},
};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN_TOKEN: &str = "admin-session-token";
const USER_TOKEN: &str = "user-session-token";

fn identity(role: Role) -> ResolvedIdentity {
    ResolvedIdentity {
        id: Uuid::from_u128(match role {
            Role::Admin => 1,
            Role::User => 2,
        }),
        email: format!("{}@example.com", role.as_str().to_lowercase()),
        role,
    }
}

fn create_app() -> axum::Router {
    let resolver = MockIdentityResolver::new()
        .with_identity(ADMIN_TOKEN, identity(Role::Admin))
        .with_identity(USER_TOKEN, identity(Role::User));

    create_router(AppState {
        config: AppConfig::default(),
        identity: Arc::new(IdentityStore::new(Arc::new(resolver), Duration::from_secs(30))),
    })
}

fn get_with_session(path: &str, token: &str) -> Request<Body> {
    Request::get(path)
        .header(header::COOKIE, format!("access_token={token}"))
        .body(Body::empty())
        .unwrap()
}

// --- State Machine ---

#[test]
fn test_guard_starts_resolving_and_shows_loading() {
    let (guard, _ticket) = AdminGuard::mount("/admin/dashboard");

    assert_eq!(guard.state(), GuardState::Resolving);
    assert_eq!(guard.view(), GuardView::Loading);
    assert!(!guard.state().is_terminal());
}

#[test]
fn test_guard_never_shows_content_before_resolution() {
    let (mut guard, ticket) = UserGuard::mount("/dashboard");
    // Still resolving: placeholder only, even though the outcome will be Allowed.
    assert_ne!(guard.view(), GuardView::Content);

    let navigation = guard.on_resolved(ticket, Some(&identity(Role::User)));
    assert!(navigation.is_none());
    assert_eq!(guard.state(), GuardState::Allowed);
    assert_eq!(guard.view(), GuardView::Content);
}

#[test]
fn test_guard_unauthenticated_goes_to_login_with_redirect() {
    let (mut guard, ticket) = AdminGuard::mount("/admin/users");

    let navigation = guard.on_resolved(ticket, None).expect("expected a redirect");

    assert_eq!(navigation.to, "/auth/login?redirect=%2Fadmin%2Fusers");
    assert_eq!(navigation.notice.message, LOGIN_REQUIRED_MESSAGE);
    assert_eq!(guard.state(), GuardState::DeniedUnauthenticated);
    assert_eq!(guard.view(), GuardView::Nothing);
}

#[test]
fn test_admin_guard_sends_user_to_user_landing() {
    let (mut guard, ticket) = AdminGuard::mount("/admin/dashboard");

    let navigation = guard
        .on_resolved(ticket, Some(&identity(Role::User)))
        .expect("expected a redirect");

    assert_eq!(navigation.to, "/dashboard");
    assert_eq!(navigation.notice.message, AdminOnly::denial_message());
    assert_eq!(guard.state(), GuardState::DeniedWrongRole);
    assert_eq!(guard.view(), GuardView::Nothing);
}

#[test]
fn test_user_guard_sends_admin_to_admin_landing() {
    let (mut guard, ticket) = UserGuard::mount("/dashboard/profile");

    let navigation = guard
        .on_resolved(ticket, Some(&identity(Role::Admin)))
        .expect("expected a redirect");

    assert_eq!(navigation.to, "/admin/dashboard");
    assert_eq!(navigation.notice.message, UserOnly::denial_message());
    assert_eq!(guard.state(), GuardState::DeniedWrongRole);
}

#[test]
fn test_resolution_after_unmount_is_ignored() {
    let (mut guard, ticket) = AdminGuard::mount("/admin/dashboard");
    guard.unmount();

    assert!(guard.on_resolved(ticket, None).is_none());
    assert_eq!(guard.state(), GuardState::Resolving);
    assert!(!guard.is_mounted());
}

#[test]
fn test_invalidate_reenters_resolving_and_drops_stale_result() {
    let (mut guard, first) = UserGuard::mount("/dashboard");
    assert!(guard.on_resolved(first, Some(&identity(Role::User))).is_none());
    assert_eq!(guard.state(), GuardState::Allowed);

    // Logout while mounted.
    let second = guard.invalidate();
    assert_eq!(guard.state(), GuardState::Resolving);
    assert_eq!(guard.view(), GuardView::Loading);

    // A late result from the first resolution must not act.
    assert!(guard.on_resolved(first, Some(&identity(Role::User))).is_none());
    assert_eq!(guard.state(), GuardState::Resolving);

    let navigation = guard.on_resolved(second, None).expect("expected a redirect");
    assert_eq!(navigation.to, "/auth/login?redirect=%2Fdashboard");
}

#[test]
fn test_terminal_states_do_not_reopen() {
    let (mut guard, ticket) = AdminGuard::mount("/admin");
    assert!(guard.on_resolved(ticket, Some(&identity(Role::Admin))).is_none());

    // A duplicate delivery for the same ticket changes nothing.
    assert!(guard.on_resolved(ticket, None).is_none());
    assert_eq!(guard.state(), GuardState::Allowed);
}

// --- Router Integration ---

#[tokio::test]
async fn test_admin_page_renders_for_admin() {
    let response = create_app()
        .oneshot(get_with_session("/admin/dashboard", ADMIN_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page: PageView = serde_json::from_slice(&body).unwrap();
    assert_eq!(page.path, "/admin/dashboard");
    assert_eq!(page.category, RouteCategory::AdminProtected);
    assert_eq!(page.viewer.map(|viewer| viewer.role), Some(Role::Admin));
}

#[tokio::test]
async fn test_admin_page_redirects_user_with_notice() {
    let response = create_app()
        .oneshot(get_with_session("/admin/users", USER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("{NOTICE_COOKIE}=")));
    assert!(cookie.contains("Admin%20privileges%20required"));
}

#[tokio::test]
async fn test_notice_cookie_carries_issue_time() {
    let before = Utc::now();
    let response = create_app()
        .oneshot(get_with_session("/admin/users", USER_TOKEN))
        .await
        .unwrap();

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    let encoded = cookie
        .strip_prefix(&format!("{NOTICE_COOKIE}="))
        .and_then(|rest| rest.split(';').next())
        .unwrap();
    let notice: Notice = serde_json::from_str(&urlencoding::decode(encoded).unwrap()).unwrap();

    assert_eq!(notice.message, AdminOnly::denial_message());
    assert!(notice.issued_at >= before);
    assert!(notice.issued_at <= Utc::now());
}

#[tokio::test]
async fn test_user_page_redirects_admin() {
    let response = create_app()
        .oneshot(get_with_session("/dashboard/profile", ADMIN_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/admin/dashboard");
}

#[tokio::test]
async fn test_user_page_renders_for_user() {
    let response = create_app()
        .oneshot(get_with_session("/dashboard/profile", USER_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unresolvable_credential_passes_gate_but_not_guard() {
    let response = create_app()
        .oneshot(get_with_session("/dashboard", "expired-or-forged"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/auth/login?redirect=%2Fdashboard"
    );
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Please%20log%20in"));
}
