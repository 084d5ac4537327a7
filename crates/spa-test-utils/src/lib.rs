//! # SPA Gateway Test Utilities
//!
//! Shared test utilities for the SPA gateway.
//!
//! This crate provides:
//! - RSA signing fixtures with matching JWKs (`TestSigningKey`)
//! - Access token claim builders for both issuers (`TestClaimsBuilder`)
//! - An in-memory key source with a lookup counter (`StaticKeySource`)
//! - A wiremock-backed identity provider (`MockIdentityProvider`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spa_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let idp = MockIdentityProvider::start().await;
//!     idp.mount_jwks(&[&TestSigningKey::primary()]).await;
//!
//!     let server = TestGatewayServer::spawn(idp.gateway_vars()).await?;
//!     let response = reqwest::get(format!("{}/health", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod key_source;
pub mod mock_idp;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use key_source::*;
pub use mock_idp::*;
pub use server_harness::*;
pub use token_builders::*;
