//! Storefront Access Token management service.
//!
//! This binary serves the token endpoints consumed by the storefront
//! front-ends on port 4000.
//!
//! # Architecture
//!
//! - Axum HTTP server exposing fetch/rotate/cleanup endpoints
//! - Token lifecycle (mint, cache, rotate, cleanup) in `storefront-tokens-core`
//! - Shopify Admin API is the only outbound dependency
//! - Token records cached in process memory, or in `PostgreSQL` when
//!   `TOKENS_DATABASE_URL` is set (required when running more than one
//!   instance, so instances don't mint and reap each other's tokens)

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::http::{HeaderValue, Method, header};
use axum::{Router, routing::get};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_tokens_core::service::StorefrontTokenService;
use storefront_tokens_core::shopify::AdminClient;
use storefront_tokens_core::store::{AnyTokenStore, MemoryTokenStore, PostgresTokenStore};
use storefront_tokens_core::types::ShopCredentials;

use storefront_tokens_server::config::ServerConfig;
use storefront_tokens_server::state::AppState;
use storefront_tokens_server::{db, routes};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the CORS layer for the configured storefront origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "storefront_tokens_server=info,storefront_tokens_core=info,tower_http=debug".into()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Pick the token store: shared PostgreSQL when configured, otherwise
    // process memory (single instance only).
    let store = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            tracing::info!("Using PostgreSQL token store");
            AnyTokenStore::Postgres(PostgresTokenStore::new(pool, config.tokens.cache_ttl))
        }
        None => {
            tracing::warn!(
                "TOKENS_DATABASE_URL not set, caching tokens in process memory only"
            );
            AnyTokenStore::Memory(MemoryTokenStore::new(config.tokens.cache_ttl))
        }
    };

    // Build the token lifecycle service
    let gateway =
        AdminClient::new(&config.shopify.api_version).expect("Failed to create Admin API client");
    let shop = ShopCredentials::new(
        config.shopify.store_domain.clone(),
        config.shopify.admin_api_token.clone(),
    );
    let tokens = StorefrontTokenService::new(
        store,
        gateway,
        shop,
        config.tokens.rotation_period,
        config.tokens.title_prefix.clone(),
    );

    let cors = cors_layer(&config.cors_origins);
    let state = AppState::new(config.clone(), tokens);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("token service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
