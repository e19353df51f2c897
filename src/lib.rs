//! Gatehouse - A multi-provider authentication service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Login/logout/session endpoints                           │
//! │  - OAuth connect endpoints per provider                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Authentication Layer                        │
//! │  - Login strategies (local, Facebook, Twitter, Google)      │
//! │  - Shared validation gate                                   │
//! │  - HMAC-signed session tokens                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Pluggable user store behind a trait                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: Login strategies, sessions, OAuth providers
//! - `users`: User store trait and its SQLite/in-memory adapters
//! - `data`: Database connection and shared models
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus metrics

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod users;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and the provider registry.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection
    pub db: Arc<data::Database>,

    /// User store backing every login strategy
    pub users: Arc<dyn users::UserStore>,

    /// Login strategies and session serialization
    pub authenticator: Arc<auth::Authenticator>,

    /// Configured OAuth provider clients
    pub providers: Arc<auth::ProviderRegistry>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Wrap the pool in the SQL user store
    /// 3. Build the authenticator on top of the store
    /// 4. Configure one OAuth client per provider
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database).await?;

        // 2. User store on top of the pool
        let users: Arc<dyn users::UserStore> =
            Arc::new(users::SqlUserStore::new(db.pool().clone()));
        tracing::info!("User store initialized");

        // 3. Authenticator shared by every login strategy
        let authenticator = auth::Authenticator::new(users.clone());

        // 4. OAuth clients for the configured providers
        let providers = auth::ProviderRegistry::from_config(&config.auth, &config.server.base_url())?;
        tracing::info!("OAuth provider registry initialized");

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            users,
            authenticator: Arc::new(authenticator),
            providers: Arc::new(providers),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(state.clone()))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(metrics::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
