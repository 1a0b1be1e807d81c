use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Role Model ---

/// Role
///
/// The closed set of roles an authenticated identity can carry. Issued by the
/// identity collaborator and never changed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Lenient parse used at the token/collaborator boundary.
    /// Returns `None` for anything outside the closed set.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Route Model ---

/// RouteOwner
///
/// The role class required to reach a path. `Common` admits any authenticated role.
/// An unrestricted path has no owner (`Option::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteOwner {
    Admin,
    User,
    Common,
}

impl RouteOwner {
    /// True when a caller holding `role` satisfies this owner.
    pub fn admits(&self, role: Role) -> bool {
        match self {
            RouteOwner::Common => true,
            RouteOwner::Admin => role == Role::Admin,
            RouteOwner::User => role == Role::User,
        }
    }
}

/// RouteCategory
///
/// Classification of a request path, recomputed per request from the fixed route tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteCategory {
    Public,
    AuthOnly,
    AdminProtected,
    UserProtected,
    CommonProtected,
}

impl From<RouteOwner> for RouteCategory {
    fn from(owner: RouteOwner) -> Self {
        match owner {
            RouteOwner::Admin => RouteCategory::AdminProtected,
            RouteOwner::User => RouteCategory::UserProtected,
            RouteOwner::Common => RouteCategory::CommonProtected,
        }
    }
}

// --- Identity Model ---

/// ResolvedIdentity
///
/// The fully verified user record produced by the identity store once session
/// validation completes. Role Guards only ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResolvedIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// SessionSnapshot
///
/// Wire view of the caller's resolved session, served by `GET /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub user: Option<ResolvedIdentity>,
}

impl SessionSnapshot {
    pub fn from_identity(identity: Option<ResolvedIdentity>) -> Self {
        Self {
            is_authenticated: identity.is_some(),
            user: identity,
        }
    }
}

// --- Guard Output ---

/// Notice
///
/// A user-facing message explaining why a navigation was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notice {
    pub message: String,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issued_at: Utc::now(),
        }
    }
}

// --- API Payloads ---

/// Query parameters carrying the recoverable post-login destination.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct RedirectParams {
    pub redirect: Option<String>,
}

/// LandingResponse
///
/// Where a freshly authenticated caller should be sent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LandingResponse {
    pub destination: String,
}

/// PageView
///
/// Stand-in body returned by page routes once both tiers have admitted the request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageView {
    pub path: String,
    pub category: RouteCategory,
    pub viewer: Option<ResolvedIdentity>,
}
