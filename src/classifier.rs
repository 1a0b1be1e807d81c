//! Route Classifier
//!
//! Pure mapping from a request path to its route owner and category, driven by
//! fixed, build-time route tables. Nothing here performs I/O or keeps state.

use crate::models::{RouteCategory, RouteOwner};

// --- Fixed Route Tables ---

/// Pages reachable without any session.
pub const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/auth/login",
    "/auth/register",
    "/auth/forgot-password",
    "/auth/reset-password",
    "/auth/verify-email",
    "/terms",
    "/privacy",
];

/// Pages only an unauthenticated visitor should see (login/register family).
pub const AUTH_ONLY_ROUTES: &[&str] = &["/auth/login", "/auth/register", "/auth/forgot-password"];

/// Path prefixes that never reach the classifier: API routes, static and image
/// assets, and well-known metadata files.
pub const GATE_EXCLUDED_PREFIXES: &[&str] = &["/api", "/_next/static", "/_next/image", "/static"];
pub const GATE_EXCLUDED_FILES: &[&str] = &["/favicon.ico", "/sitemap.xml", "/robots.txt"];

/// RouteConfig
///
/// Membership rule for one route owner: a path belongs to the config when it
/// matches an exact entry OR starts with one of the prefixes.
#[derive(Debug, Clone, Copy)]
pub struct RouteConfig {
    pub owner: RouteOwner,
    pub exact: &'static [&'static str],
    pub prefixes: &'static [&'static str],
}

impl RouteConfig {
    pub const fn new(
        owner: RouteOwner,
        exact: &'static [&'static str],
        prefixes: &'static [&'static str],
    ) -> Self {
        Self {
            owner,
            exact,
            prefixes,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.exact.iter().any(|exact| *exact == path)
            || self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

pub const ADMIN_ROUTES: RouteConfig = RouteConfig::new(RouteOwner::Admin, &[], &["/admin"]);
pub const USER_ROUTES: RouteConfig = RouteConfig::new(RouteOwner::User, &[], &["/dashboard"]);
pub const COMMON_ROUTES: RouteConfig =
    RouteConfig::new(RouteOwner::Common, &["/my-profile", "/settings"], &[]);

/// Protected configs in resolution order. ADMIN must come first so a path that
/// satisfies several configs never resolves to a weaker owner.
pub const PROTECTED_ROUTES: [RouteConfig; 3] = [ADMIN_ROUTES, USER_ROUTES, COMMON_ROUTES];

// --- Predicates ---

/// route_owner
///
/// Returns the role class required for `path`, or `None` when unrestricted.
pub fn route_owner(path: &str) -> Option<RouteOwner> {
    route_owner_in(&PROTECTED_ROUTES, path)
}

/// First matching config in `configs` wins.
pub fn route_owner_in(configs: &[RouteConfig], path: &str) -> Option<RouteOwner> {
    configs
        .iter()
        .find(|config| config.matches(path))
        .map(|config| config.owner)
}

pub fn is_auth_only_route(path: &str) -> bool {
    AUTH_ONLY_ROUTES.iter().any(|route| *route == path)
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|route| *route == path)
}

/// categorize
///
/// Folds the predicates above into a single category. Ownership wins over the
/// auth-only list, which in turn wins over plain public access.
pub fn categorize(path: &str) -> RouteCategory {
    if let Some(owner) = route_owner(path) {
        return owner.into();
    }
    if is_auth_only_route(path) {
        return RouteCategory::AuthOnly;
    }
    RouteCategory::Public
}

/// Paths the edge gate never inspects.
pub fn is_excluded_from_gate(path: &str) -> bool {
    GATE_EXCLUDED_FILES.iter().any(|file| *file == path)
        || GATE_EXCLUDED_PREFIXES
            .iter()
            .filter_map(|prefix| path.strip_prefix(prefix))
            .any(|rest| rest.is_empty() || rest.starts_with('/'))
}
