//! Edge Gate
//!
//! Request-interception stage that runs before any page handler. It only looks
//! at the path, the `redirect` query parameter and whether a session credential
//! is present. The credential is never decoded here, so the gate cannot know
//! the caller's role and cannot fail.

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    auth::session_token,
    classifier::is_excluded_from_gate,
    config::AppConfig,
    models::RedirectParams,
    policy::{NavigationRequest, RedirectAction, decide},
};

/// AuthenticationSignal
///
/// Credential presence for one request. Says nothing about validity or role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationSignal(bool);

impl AuthenticationSignal {
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        Self(session_token(headers, cookie_name).is_some())
    }

    pub fn is_authenticated(&self) -> bool {
        self.0
    }
}

impl From<bool> for AuthenticationSignal {
    fn from(present: bool) -> Self {
        Self(present)
    }
}

/// GateDecision
///
/// What the gate emits for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    Redirect(String),
}

/// evaluate
///
/// Applies the redirect policy to a request URI using only the credential signal.
/// Excluded paths (API, assets, metadata files) always continue.
pub fn evaluate(uri: &Uri, signal: AuthenticationSignal) -> GateDecision {
    let path = uri.path();
    if is_excluded_from_gate(path) {
        return GateDecision::Continue;
    }

    // A malformed query string is the same as no redirect parameter.
    let params = Query::<RedirectParams>::try_from_uri(uri)
        .map(|Query(params)| params)
        .unwrap_or_default();

    let request =
        NavigationRequest::classify(path, params.redirect.as_deref(), signal.is_authenticated());

    match decide(&request) {
        RedirectAction::Allow => GateDecision::Continue,
        RedirectAction::Redirect(target) => GateDecision::Redirect(target),
    }
}

/// edge_gate
///
/// axum middleware wrapping the whole router. Emits a 307 redirect or passes the
/// request on untouched.
pub async fn edge_gate(State(config): State<AppConfig>, request: Request, next: Next) -> Response {
    let signal = AuthenticationSignal::from_headers(request.headers(), &config.session_cookie);

    match evaluate(request.uri(), signal) {
        GateDecision::Continue => next.run(request).await,
        GateDecision::Redirect(target) => {
            debug!(
                path = %request.uri().path(),
                authenticated = signal.is_authenticated(),
                target = %target,
                "edge gate redirect"
            );
            Redirect::temporary(&target).into_response()
        }
    }
}
