use std::{env, time::Duration};

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through the
/// application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and secret strictness.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Name of the cookie carrying the session credential.
    pub session_cookie: String,
    // HS256 secret used by the JWT identity resolver.
    pub jwt_secret: String,
    // Optional remote identity endpoint. When set it replaces local JWT decoding.
    pub identity_endpoint: Option<String>,
    // Upper bound on a single identity resolution.
    pub identity_timeout: Duration,
    // How long a successful resolution stays memoized.
    pub identity_cache_ttl: Duration,
}

/// Env
///
/// Runtime context: local development or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_COOKIE: &str = "access_token";
const LOCAL_JWT_SECRET: &str = "route-authz-local-development-secret";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            identity_endpoint: None,
            identity_timeout: Duration::from_secs(5),
            identity_cache_ttl: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when neither `JWT_SECRET` nor `IDENTITY_ENDPOINT` is set,
    /// since the service would otherwise have no way to resolve identities.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let identity_endpoint = env::var("IDENTITY_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let jwt_secret = match (&env, &identity_endpoint) {
            (Env::Production, None) => env::var("JWT_SECRET")
                .expect("FATAL: JWT_SECRET or IDENTITY_ENDPOINT must be set in production."),
            _ => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            session_cookie: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| DEFAULT_SESSION_COOKIE.to_string()),
            jwt_secret,
            identity_endpoint,
            identity_timeout: Duration::from_secs(secs_from_env("IDENTITY_TIMEOUT_SECS", 5)),
            identity_cache_ttl: Duration::from_secs(secs_from_env("IDENTITY_CACHE_TTL_SECS", 30)),
        }
    }
}

// Unparseable values fall back to the default rather than aborting startup.
fn secs_from_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
