//! Postboard - a small session-authenticated posts and messages backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - authenticate / require_login middleware                  │
//! │  - account, post, message and upload handlers               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Auth & Service Layer                         │
//! │  - password hashing, session/CSRF tokens                    │
//! │  - registration / login / logout                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Local image storage                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and routers
//! - `auth`: password hashing, session tokens, authentication middleware
//! - `service`: account flows
//! - `data`: database layer
//! - `storage`: uploaded image storage
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Uploaded image storage
    pub storage: Arc<storage::MediaStorage>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Prepare the media directory
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        let storage = storage::MediaStorage::new(&config.storage).await?;
        tracing::info!(media_dir = %config.storage.media_dir.display(), "Media storage initialized");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            storage: Arc::new(storage),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit};
    use tower::ServiceBuilder;
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, services::ServeDir,
        timeout::TimeoutLayer, trace::TraceLayer,
    };

    let server = &state.config.server;
    let body_limit = state.storage.request_body_limit();

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(server))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(tower_http::map_response_body::MapResponseBodyLayer::new(axum::body::Body::new))
        .layer(RequestBodyLimitLayer::new(body_limit));

    Router::new()
        .merge(api::public_router())
        .merge(api::session_router(state.clone()))
        .nest_service(
            storage::MEDIA_URL_PREFIX,
            ServeDir::new(state.storage.root()),
        )
        .layer(layers)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderName, HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let Some(frontend_url) = server.frontend_url.as_deref() else {
        return CorsLayer::new();
    };

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::PATCH,
            ])
            .allow_headers([
                header::ACCEPT,
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(auth::CSRF_HEADER),
            ])
            .allow_credentials(true),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %frontend_url,
                "Failed to parse frontend origin; denying cross-origin requests"
            );
            CorsLayer::new()
        }
    }
}
