//! Service layer for the SPA gateway.
//!
//! # Components
//!
//! - `identity_provider` - Auth0 authorize/logout URLs and token endpoint calls

pub mod identity_provider;

pub use identity_provider::{generate_state, Auth0Settings, IdentityProviderClient, TokenSet};
