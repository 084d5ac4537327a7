//! HTTP routes for the SPA gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::BearerTokenGate;
use crate::config::Config;
use crate::errors::GatewayError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::IdentityProviderClient;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Auth0 broker client.
    pub identity_provider: IdentityProviderClient,

    /// Bearer token gate for protected routes.
    pub gate: Arc<BearerTokenGate>,
}

impl AppState {
    /// Build state with HTTP-backed JWKS clients and identity provider.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if an HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let identity_provider = IdentityProviderClient::from_config(&config)?;
        let gate = Arc::new(BearerTokenGate::from_config(&config));

        Ok(Self {
            config,
            identity_provider,
            gate,
        })
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/auth/login`, `/auth/callback`, `/auth/logout` - browser redirects - public
/// - `/auth/token`, `/auth/refresh` - token endpoint broker - public
/// - `/api/me` - Verified caller identity - requires a bearer token
/// - Fallback: SPA bundle from `STATIC_DIR`, unknown paths serve `index.html`
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        gate: Arc::clone(&state.gate),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/login", get(handlers::login))
        .route("/auth/callback", get(handlers::callback))
        .route("/auth/logout", get(handlers::logout))
        .route("/auth/token", post(handlers::exchange_token))
        .route("/auth/refresh", post(handlers::refresh_token))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state.clone());

    // Client-side routing: any path without a file gets index.html
    let static_dir = Path::new(&state.config.static_dir);
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
