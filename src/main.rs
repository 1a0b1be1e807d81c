use route_authz::{
    AppState, IdentityStore,
    auth::{IdentityResolver, JwtIdentityResolver, RemoteIdentityResolver},
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, installs logging, wires the identity store and serves
/// the gated router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "route_authz=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Identity collaborator: a remote identity endpoint when configured,
    // local JWT validation otherwise.
    let resolver: Arc<dyn IdentityResolver> = match &config.identity_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Resolving identities via remote endpoint");
            Arc::new(
                RemoteIdentityResolver::new(endpoint.clone(), config.identity_timeout)
                    .expect("FATAL: Failed to build identity HTTP client."),
            )
        }
        None => {
            tracing::info!("Resolving identities from signed session tokens");
            Arc::new(JwtIdentityResolver::new(&config.jwt_secret))
        }
    };

    let identity = Arc::new(IdentityStore::new(resolver, config.identity_cache_ttl));

    // 4. Router and server startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { config, identity });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/api/docs", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
