//! SPA Gateway Library
//!
//! An HTTP service that fronts a single-page application:
//!
//! - Serves the SPA bundle with client-side routing fallback
//! - Brokers Auth0 authorization-code login (optionally federated to Azure AD)
//! - Verifies bearer access tokens from Azure AD or Auth0
//! - Exposes a protected endpoint echoing the verified identity
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth::BearerTokenGate -> auth::KeySource
//!               -> handlers/*.rs      -> services/identity_provider.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Bearer token gate, issuer classification, JWKS key sources
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Auth0 broker client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod services;
