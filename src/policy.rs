//! Redirect Policy
//!
//! Pure decisions over (authentication state, role, requested path). The edge
//! gate calls `decide` with only the credential-presence signal; the role guards
//! and the post-login landing use the role-aware helpers.

use crate::{
    classifier::{is_auth_only_route, is_public_route, route_owner},
    models::{Role, RouteOwner},
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const ADMIN_LANDING_PATH: &str = "/admin/dashboard";
pub const USER_LANDING_PATH: &str = "/dashboard";
pub const ROOT_PATH: &str = "/";

/// Name of the query parameter carrying the recoverable destination.
pub const REDIRECT_PARAM: &str = "redirect";

/// RedirectAction
///
/// The outcome of the policy for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    Allow,
    Redirect(String),
}

/// NavigationRequest
///
/// Everything the policy is allowed to know about a navigation. `owner` is the
/// classifier result for `path`.
#[derive(Debug, Clone, Copy)]
pub struct NavigationRequest<'a> {
    pub path: &'a str,
    pub redirect_param: Option<&'a str>,
    pub is_authenticated: bool,
    pub owner: Option<RouteOwner>,
}

impl<'a> NavigationRequest<'a> {
    /// Builds a request with the owner filled in from the fixed route tables.
    pub fn classify(path: &'a str, redirect_param: Option<&'a str>, is_authenticated: bool) -> Self {
        Self {
            path,
            redirect_param,
            is_authenticated,
            owner: route_owner(path),
        }
    }
}

/// decide
///
/// Rule order:
/// 1. authenticated on an auth-only page: send away, honoring `redirect` when it is local;
/// 2. public page with no owner: allow;
/// 3. unauthenticated on an owned page: login with the original path attached;
/// 4. anything else (including authenticated on an owned page): allow, the role
///    guards do the precise check.
///
/// Rule 1 sits ahead of rule 2 because every auth-only page is also on the public list.
pub fn decide(request: &NavigationRequest<'_>) -> RedirectAction {
    if request.is_authenticated && is_auth_only_route(request.path) {
        let destination = request
            .redirect_param
            .filter(|target| is_local_path(target))
            .unwrap_or(USER_LANDING_PATH);
        return RedirectAction::Redirect(destination.to_string());
    }

    if is_public_route(request.path) && request.owner.is_none() {
        return RedirectAction::Allow;
    }

    if !request.is_authenticated && request.owner.is_some() {
        return RedirectAction::Redirect(login_redirect(request.path));
    }

    RedirectAction::Allow
}

/// Login URL with `path` attached as the URL-encoded `redirect` parameter.
pub fn login_redirect(path: &str) -> String {
    format!("{LOGIN_PATH}?{REDIRECT_PARAM}={}", urlencoding::encode(path))
}

/// default_dashboard_route
///
/// Landing page for a resolved role; unknown roles land on the public root.
pub fn default_dashboard_route(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => ADMIN_LANDING_PATH,
        Some(Role::User) => USER_LANDING_PATH,
        None => ROOT_PATH,
    }
}

/// is_valid_redirect_for_role
///
/// A target is valid when its owner is none, `Common`, or exactly the caller's role.
/// Any query string or fragment on the target is ignored for classification.
pub fn is_valid_redirect_for_role(target: &str, role: Role) -> bool {
    match route_owner(strip_query(target)) {
        None => true,
        Some(owner) => owner.admits(role),
    }
}

/// post_login_destination
///
/// Where to send a caller right after authenticating: the recovered `redirect`
/// when it is local and valid for the role, otherwise the role's landing page.
pub fn post_login_destination(redirect: Option<&str>, role: Role) -> String {
    redirect
        .filter(|target| is_local_path(target) && is_valid_redirect_for_role(target, role))
        .map(str::to_string)
        .unwrap_or_else(|| default_dashboard_route(Some(role)).to_string())
}

/// Only same-origin absolute paths are followed. Protocol-relative (`//host`) and
/// backslash variants are rejected, as is anything carrying a control character:
/// browsers drop tabs and newlines while parsing a `Location`, and a raw newline
/// cannot be written into the header at all.
pub fn is_local_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(char::is_control)
}

fn strip_query(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}
