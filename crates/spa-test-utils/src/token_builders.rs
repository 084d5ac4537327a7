//! Builder patterns for test access token claims
//!
//! Provides fluent APIs for Auth0 and Azure AD shaped claim sets.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Auth0 tenant domain used across tests.
pub const TEST_AUTH0_DOMAIN: &str = "example.auth0.com";

/// Auth0 client ID used across tests; also the default Auth0 audience.
pub const TEST_AUTH0_CLIENT_ID: &str = "client123";

/// Azure AD audience used across tests.
pub const TEST_AZURE_AUDIENCE: &str = "api://spa-gateway-test";

/// Azure AD tenant ID used across tests.
pub const TEST_AZURE_TENANT: &str = "72f988bf-86f1-41af-91ab-2d7cd011db47";

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::auth0()
///     .subject("auth0|alice")
///     .expires_in(3600)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Claims as issued by the test Auth0 tenant to the test client.
    pub fn auth0() -> Self {
        let now = Utc::now();
        Self::from_value(json!({
            "iss": format!("https://{}/", TEST_AUTH0_DOMAIN),
            "sub": "auth0|test-user",
            "aud": TEST_AUTH0_CLIENT_ID,
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(3600)).timestamp(),
        }))
    }

    /// Claims as issued by Azure AD v2.0 for the test tenant and audience.
    pub fn azure() -> Self {
        let now = Utc::now();
        Self::from_value(json!({
            "iss": format!("https://login.microsoftonline.com/{}/v2.0", TEST_AZURE_TENANT),
            "sub": "azure-subject",
            "aud": TEST_AZURE_AUDIENCE,
            "oid": "00000000-0000-0000-0000-0000000000aa",
            "tid": TEST_AZURE_TENANT,
            "preferred_username": "alice@contoso.com",
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(3600)).timestamp(),
        }))
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(claims) => Self { claims },
            _ => Self { claims: Map::new() },
        }
    }

    /// Set the issuer
    pub fn issuer(self, iss: &str) -> Self {
        self.claim("iss", iss)
    }

    /// Set the subject
    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", sub)
    }

    /// Set the audience (a single string)
    pub fn audience(self, aud: &str) -> Self {
        self.claim("aud", aud)
    }

    /// Set the audience to a list
    pub fn audiences(self, auds: &[&str]) -> Self {
        self.claim("aud", auds.to_vec())
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", (Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set issued-at relative to now (positive is in the future)
    pub fn issued_in(self, seconds: i64) -> Self {
        self.claim("iat", (Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set not-before relative to now (positive is in the future)
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.claim("nbf", (Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}
