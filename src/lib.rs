use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core, leaf-first.
pub mod classifier;
pub mod policy;
pub mod gate;
pub mod guard;

// Identity collaborator and shared session state.
pub mod auth;
pub mod identity;

pub mod config;
pub mod handlers;
pub mod models;

// Page and API routers, grouped by route owner.
pub mod routes;
use routes::{admin, api, common, public, user};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, IdentityStore};

/// ApiDoc
///
/// OpenAPI document for the `/api` surface, served at `/api/openapi.json`.
/// Page routes are intentionally absent: they answer with redirects, not data.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::get_session, handlers::logout, handlers::get_landing
    ),
    components(
        schemas(
            models::Role, models::ResolvedIdentity, models::SessionSnapshot,
            models::LandingResponse, models::Notice,
        )
    ),
    tags(
        (name = "route-authz", description = "Role-based route authorization")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for the loaded configuration and the
/// application-wide identity store.
#[derive(Clone)]
pub struct AppState {
    /// Configuration: session cookie name, identity settings, environment.
    pub config: AppConfig,
    /// Identity store: memoized credential resolution shared by every guard.
    pub identity: IdentityState,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

/// create_router
///
/// Assembles the page and API routers and wraps them in the two enforcement
/// tiers: role guards as route layers on the `/admin` and `/dashboard` groups,
/// and the edge gate around everything.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI and the raw OpenAPI document.
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        // API Routes: session lookups for client pages. The gate skips `/api`.
        .merge(api::api_routes())
        // Public and auth-only pages: no guard.
        .merge(public::public_routes())
        // Common pages: any authenticated role, enforced by the gate alone.
        .merge(common::common_routes())
        // Role-restricted pages: the guard re-checks with the resolved identity.
        .merge(user::user_routes(state.clone()))
        .merge(admin::admin_routes(state.clone()))
        .fallback(|| async { StatusCode::NOT_FOUND })
        // 2a. Edge Gate: outermost of the two tiers, wraps every route and the fallback.
        .layer(middleware::from_fn_with_state(state.clone(), gate::edge_gate))
        // Apply the shared state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a fresh UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every HTTP request, correlated by the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
