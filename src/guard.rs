//! Role Guards
//!
//! Second enforcement tier. A guard wraps role-restricted pages and only
//! decides once the caller's identity has been fully resolved; until then it
//! shows a loading placeholder and takes no action.
//!
//! `RoleGuard<R>` is the per-navigation state machine:
//!
//! ```text
//! Resolving ──► Allowed
//!          ├──► DeniedUnauthenticated
//!          └──► DeniedWrongRole
//! ```
//!
//! `invalidate` (e.g. logout) sends a mounted guard back to `Resolving`. Results
//! from a superseded resolution, or arriving after `unmount`, are discarded.
//! `enforce_role` drives the machine for one HTTP request.

use axum::{
    extract::{OriginalUri, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use crate::{
    auth::resolve_session,
    config::AppConfig,
    identity::IdentityState,
    models::{Notice, ResolvedIdentity, Role},
    policy::{default_dashboard_route, login_redirect},
};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// Cookie carrying the denial notice across the redirect.
pub const NOTICE_COOKIE: &str = "access_notice";

// --- Role Requirements ---

/// RoleRequirement
///
/// The one capability a guard variant needs: which role it admits and what to
/// tell everyone else.
pub trait RoleRequirement: Send + Sync + 'static {
    const LABEL: &'static str;

    fn admits(role: Role) -> bool;

    fn denial_message() -> &'static str;
}

/// Admits only `Role::Admin`.
#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

impl RoleRequirement for AdminOnly {
    const LABEL: &'static str = "admin";

    fn admits(role: Role) -> bool {
        role == Role::Admin
    }

    fn denial_message() -> &'static str {
        "Access denied. Admin privileges required."
    }
}

/// Admits only `Role::User`.
#[derive(Debug, Clone, Copy)]
pub struct UserOnly;

impl RoleRequirement for UserOnly {
    const LABEL: &'static str = "user";

    fn admits(role: Role) -> bool {
        role == Role::User
    }

    fn denial_message() -> &'static str {
        "Access denied. This page is for regular users only."
    }
}

// --- State Machine ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Resolving,
    Allowed,
    DeniedUnauthenticated,
    DeniedWrongRole,
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Resolving)
    }
}

/// What the guard renders in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Content,
    Nothing,
}

/// Navigation
///
/// A redirect the guard wants performed, with the notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub to: String,
    pub notice: Notice,
}

/// The notice travels as URL-encoded JSON so the page can read both the message
/// and `issued_at` back through the generated `Notice` binding.
impl IntoResponse for Navigation {
    fn into_response(self) -> Response {
        let payload = match serde_json::to_string(&self.notice) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize access notice");
                return Redirect::temporary(&self.to).into_response();
            }
        };
        let cookie = format!(
            "{NOTICE_COOKIE}={}; Path=/; Max-Age=30; SameSite=Lax",
            urlencoding::encode(&payload)
        );
        (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::temporary(&self.to)).into_response()
    }
}

/// Identifies which resolution a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
}

/// RoleGuard
///
/// One guard instance per mounted page.
#[derive(Debug)]
pub struct RoleGuard<R> {
    current_path: String,
    state: GuardState,
    generation: u64,
    mounted: bool,
    _requirement: PhantomData<R>,
}

pub type AdminGuard = RoleGuard<AdminOnly>;
pub type UserGuard = RoleGuard<UserOnly>;

impl<R: RoleRequirement> RoleGuard<R> {
    /// Mounts a guard for `current_path` in `Resolving` and hands back the ticket
    /// the pending resolution must present.
    pub fn mount(current_path: impl Into<String>) -> (Self, ResolutionTicket) {
        let guard = Self {
            current_path: current_path.into(),
            state: GuardState::Resolving,
            generation: 0,
            mounted: true,
            _requirement: PhantomData,
        };
        let ticket = guard.ticket();
        (guard, ticket)
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn view(&self) -> GuardView {
        match self.state {
            GuardState::Resolving => GuardView::Loading,
            GuardState::Allowed => GuardView::Content,
            GuardState::DeniedUnauthenticated | GuardState::DeniedWrongRole => GuardView::Nothing,
        }
    }

    /// on_resolved
    ///
    /// Applies a finished resolution. `None` for `identity` covers both an
    /// anonymous caller and a failed resolution. Returns the navigation to
    /// perform, if any.
    pub fn on_resolved(
        &mut self,
        ticket: ResolutionTicket,
        identity: Option<&ResolvedIdentity>,
    ) -> Option<Navigation> {
        if !self.mounted || ticket != self.ticket() || self.state.is_terminal() {
            debug!(guard = R::LABEL, "discarding stale identity resolution");
            return None;
        }

        match identity {
            None => {
                self.state = GuardState::DeniedUnauthenticated;
                Some(Navigation {
                    to: login_redirect(&self.current_path),
                    notice: Notice::new(LOGIN_REQUIRED_MESSAGE),
                })
            }
            Some(identity) if R::admits(identity.role) => {
                self.state = GuardState::Allowed;
                None
            }
            Some(identity) => {
                self.state = GuardState::DeniedWrongRole;
                Some(Navigation {
                    to: default_dashboard_route(Some(identity.role)).to_string(),
                    notice: Notice::new(R::denial_message()),
                })
            }
        }
    }

    /// Identity went away while mounted: back to `Resolving`. Any resolution
    /// still in flight is superseded by the returned ticket.
    pub fn invalidate(&mut self) -> ResolutionTicket {
        self.generation += 1;
        self.state = GuardState::Resolving;
        self.ticket()
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    fn ticket(&self) -> ResolutionTicket {
        ResolutionTicket {
            generation: self.generation,
        }
    }
}

// --- HTTP Adapter ---

/// enforce_role
///
/// Route-layer middleware running a `RoleGuard<R>` for one request. The
/// resolved identity is placed in the request extensions for the page handler.
/// Denied requests never reach the handler.
pub async fn enforce_role<R: RoleRequirement>(
    State(config): State<AppConfig>,
    State(identity_store): State<IdentityState>,
    mut request: Request,
    next: Next,
) -> Response {
    let current_path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let (mut guard, ticket) = RoleGuard::<R>::mount(current_path.as_str());
    let identity = resolve_session(request.headers(), &config, &identity_store).await;

    if let Some(navigation) = guard.on_resolved(ticket, identity.as_ref()) {
        info!(
            guard = R::LABEL,
            path = %current_path,
            outcome = ?guard.state(),
            target = %navigation.to,
            "role guard denied access"
        );
        return navigation.into_response();
    }

    match (guard.view(), identity) {
        (GuardView::Content, Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        // Render suppressed: nothing of the protected page is sent.
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}
