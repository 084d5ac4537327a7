//! Verified token claims and the normalized caller identity.
//!
//! `Identity` is what the rest of the gateway sees of a caller. It carries
//! personal identifiers (object IDs, email, `sub`), so its Debug output is
//! redacted the same way as other claim types in this crate.

use crate::auth::error::AuthError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Claims of a token whose signature and standard claims have been verified.
///
/// Kept as a raw JSON object so provider-specific fields survive untouched.
pub type VerifiedClaims = Map<String, Value>;

/// Claims consulted, in priority order, for an Azure AD caller's email.
const AZURE_EMAIL_CLAIMS: [&str; 3] = ["preferred_username", "upn", "unique_name"];

/// Azure AD caller.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureIdentity {
    /// Object ID of the user in the tenant.
    pub oid: String,

    /// Tenant ID.
    pub tid: String,

    /// First of `preferred_username`, `upn`, `unique_name` that is present.
    pub email: Option<String>,
}

/// Auth0 caller. Every verified claim is kept.
#[derive(Clone, PartialEq)]
pub struct Auth0Identity {
    pub claims: VerifiedClaims,
}

/// Normalized identity produced by a successful verification.
///
/// Serializes as a flat object tagged by `provider`:
/// `{"provider":"azure","oid":..,"tid":..,"email":..}` or
/// `{"provider":"auth0", <claims>...}`.
#[derive(Clone, PartialEq)]
pub enum Identity {
    Azure(AzureIdentity),
    Auth0(Auth0Identity),
}

impl Identity {
    /// Build an Azure identity. `oid` and `tid` are required.
    pub fn from_azure_claims(claims: &VerifiedClaims) -> Result<Self, AuthError> {
        let oid = string_claim(claims, "oid").ok_or_else(|| {
            tracing::debug!(target: "gw.auth.claims", "Azure token has no oid claim");
            AuthError::InvalidClaims
        })?;
        let tid = string_claim(claims, "tid").ok_or_else(|| {
            tracing::debug!(target: "gw.auth.claims", "Azure token has no tid claim");
            AuthError::InvalidClaims
        })?;

        let email = AZURE_EMAIL_CLAIMS
            .iter()
            .find_map(|name| string_claim(claims, name));

        Ok(Identity::Azure(AzureIdentity { oid, tid, email }))
    }

    /// Build an Auth0 identity from the full verified claim set.
    pub fn from_auth0_claims(claims: VerifiedClaims) -> Self {
        Identity::Auth0(Auth0Identity { claims })
    }

    /// Provider tag, as serialized.
    pub fn provider(&self) -> &'static str {
        match self {
            Identity::Azure(_) => "azure",
            Identity::Auth0(_) => "auth0",
        }
    }
}

/// Non-empty string claim, or `None`.
fn string_claim(claims: &VerifiedClaims, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Identity::Azure(azure) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("provider", "azure")?;
                map.serialize_entry("oid", &azure.oid)?;
                map.serialize_entry("tid", &azure.tid)?;
                map.serialize_entry("email", &azure.email)?;
                map.end()
            }
            Identity::Auth0(auth0) => {
                // A token-supplied "provider" claim must not shadow the tag
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("provider", "auth0")?;
                for (key, value) in auth0.claims.iter().filter(|(k, _)| *k != "provider") {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Azure(azure) => f
                .debug_struct("Identity::Azure")
                .field("oid", &"[REDACTED]")
                .field("tid", &azure.tid)
                .field("email", &azure.email.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            Identity::Auth0(auth0) => f
                .debug_struct("Identity::Auth0")
                .field("claims", &auth0.claims.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
