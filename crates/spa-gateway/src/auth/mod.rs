//! Bearer token verification for the SPA gateway.
//!
//! # Components
//!
//! - `gate` - Dual-issuer verification: bearer extraction through `Identity`
//! - `issuer` - Pure classification of a token's `iss`
//! - `jwks` - `KeySource` trait and the HTTP JWKS client behind it
//! - `claims` - Verified claims and the normalized `Identity`
//! - `error` - `AuthError` failure kinds

pub mod claims;
pub mod error;
pub mod gate;
pub mod issuer;
pub mod jwks;

pub use claims::{Auth0Identity, AzureIdentity, Identity, VerifiedClaims};
pub use error::AuthError;
pub use gate::{extract_bearer_token, BearerTokenGate, GateSettings};
pub use issuer::Issuer;
pub use jwks::{Jwk, JwksClient, JwksResponse, KeySource};
