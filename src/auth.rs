use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    convert::Infallible,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    identity::IdentityState,
    models::{ResolvedIdentity, Role},
};

/// Claims
///
/// Payload expected inside a session JWT. Only the identity resolvers ever
/// decode it; the edge gate treats the token as opaque.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    pub email: String,
    /// Raw role string, mapped onto the closed `Role` set on resolution.
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// IdentityError
///
/// Why a credential could not be turned into a `ResolvedIdentity`. Every variant
/// is treated as "not authenticated" by the guards.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The collaborator explicitly rejected the credential.
    #[error("credential rejected by identity provider")]
    Unauthenticated,

    #[error("identity resolution timed out")]
    Timeout,

    #[error("identity transport error: {0}")]
    Transport(String),

    #[error("malformed identity payload: {0}")]
    Malformed(String),
}

// --- Identity Resolver Contract ---

/// IdentityResolver
///
/// Turns an opaque session credential into a verified identity. The core never
/// depends on how this happens; `IdentityStore` memoizes whatever it returns.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, IdentityError>;
}

/// JwtIdentityResolver
///
/// Validates HS256 tokens signed with the configured secret, expiry enforced.
pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, IdentityError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        let role = Role::parse(&claims.role).ok_or(IdentityError::UnknownRole(claims.role))?;

        Ok(ResolvedIdentity {
            id: claims.sub,
            email: claims.email,
            role,
        })
    }
}

/// Body returned by a remote `/me`-style identity endpoint.
#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    email: String,
    role: String,
}

/// RemoteIdentityResolver
///
/// Asks an external identity service who owns the credential. 401/403 answers
/// mean "not authenticated"; anything else non-2xx is a transport failure.
pub struct RemoteIdentityResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteIdentityResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl IdentityResolver for RemoteIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Timeout
                } else {
                    IdentityError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(IdentityError::Unauthenticated);
            }
            status if !status.is_success() => {
                return Err(IdentityError::Transport(format!(
                    "identity endpoint returned {status}"
                )));
            }
            _ => {}
        }

        let user: RemoteUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let role = Role::parse(&user.role).ok_or(IdentityError::UnknownRole(user.role))?;

        Ok(ResolvedIdentity {
            id: user.id,
            email: user.email,
            role,
        })
    }
}

/// MockIdentityResolver
///
/// In-memory resolver for tests: a fixed token table, a call counter, a failure
/// switch and an optional artificial latency.
#[derive(Default)]
pub struct MockIdentityResolver {
    identities: HashMap<String, ResolvedIdentity>,
    delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, token: &str, identity: ResolvedIdentity) -> Self {
        self.identities.insert(token.to_string(), identity);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// When set, every resolution fails with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityResolver for MockIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("mock identity failure".to_string()));
        }

        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidToken("unknown mock token".to_string()))
    }
}

// --- Credential Extraction ---

/// session_token
///
/// Finds the session credential: the named cookie first, then an
/// `Authorization: Bearer` header. Empty values count as absent.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| token_from_cookie_header(cookie_header, cookie_name));

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
        })
        .filter(|token| !token.is_empty())
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name.trim() == cookie_name).then(|| value.trim())
    })
}

/// resolve_session
///
/// Looks up the caller's credential and resolves it through the shared store.
/// A missing credential or a failed resolution both yield `None`.
pub async fn resolve_session(
    headers: &HeaderMap,
    config: &AppConfig,
    identity: &IdentityState,
) -> Option<ResolvedIdentity> {
    match session_token(headers, &config.session_cookie) {
        Some(token) => identity.resolve(token).await,
        None => None,
    }
}

/// CurrentSession
///
/// Extractor giving API handlers the caller's credential and resolved identity.
/// It never rejects: an anonymous caller simply has neither.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: Option<String>,
    pub identity: Option<ResolvedIdentity>,
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity_store = IdentityState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = session_token(&parts.headers, &config.session_cookie).map(str::to_string);
        let identity = match &token {
            Some(token) => identity_store.resolve(token).await,
            None => None,
        };

        Ok(CurrentSession { token, identity })
    }
}

/// RequireIdentity
///
/// Extractor for page handlers behind a role guard: reads the identity the guard
/// placed in the request extensions.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub ResolvedIdentity);

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedIdentity>()
            .cloned()
            .map(RequireIdentity)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
