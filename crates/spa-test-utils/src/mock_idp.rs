//! Wiremock-backed identity provider.
//!
//! One mock server plays both issuers: it publishes a JWKS document for the
//! Azure AD and Auth0 key paths and answers Auth0's token endpoint.

use crate::crypto_fixtures::{jwks_document, TestSigningKey};
use crate::token_builders::{TEST_AUTH0_CLIENT_ID, TEST_AUTH0_DOMAIN, TEST_AZURE_AUDIENCE};
use serde_json::Value;
use std::collections::HashMap;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the Auth0 JWKS is served from (relative to `AUTH0_BASE_URL`).
pub const AUTH0_JWKS_PATH: &str = "/.well-known/jwks.json";

/// Path the Azure AD JWKS is served from.
pub const AZURE_JWKS_PATH: &str = "/azure/discovery/v2.0/keys";

/// Path of the Auth0 token endpoint.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Client secret the gateway is configured with against the mock.
pub const TEST_AUTH0_CLIENT_SECRET: &str = "test-client-secret";

pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    pub fn auth0_jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), AUTH0_JWKS_PATH)
    }

    pub fn azure_jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), AZURE_JWKS_PATH)
    }

    /// Publish `keys` on both JWKS paths.
    pub async fn mount_jwks(&self, keys: &[&TestSigningKey]) {
        let document = jwks_document(keys);
        for jwks_path in [AUTH0_JWKS_PATH, AZURE_JWKS_PATH] {
            Mock::given(method("GET"))
                .and(path(jwks_path))
                .respond_with(ResponseTemplate::new(200).set_body_json(document.clone()))
                .mount(&self.server)
                .await;
        }
    }

    /// Answer token requests carrying `grant_type` with `status` and `body`.
    pub async fn mount_token_response(&self, grant_type: &str, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(format!("grant_type={grant_type}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Gateway environment pointing every provider URL at this mock.
    ///
    /// Auth0 is configured with the test domain, client and secret; Azure AD
    /// with the test audience. Caching is left at its default.
    pub fn gateway_vars(&self) -> HashMap<String, String> {
        HashMap::from([
            ("AUTH0_DOMAIN".to_string(), TEST_AUTH0_DOMAIN.to_string()),
            ("AUTH0_CLIENT_ID".to_string(), TEST_AUTH0_CLIENT_ID.to_string()),
            (
                "AUTH0_CLIENT_SECRET".to_string(),
                TEST_AUTH0_CLIENT_SECRET.to_string(),
            ),
            ("AUTH0_BASE_URL".to_string(), self.server.uri()),
            ("AZURE_AUDIENCE".to_string(), TEST_AZURE_AUDIENCE.to_string()),
            ("AZURE_JWKS_URL".to_string(), self.azure_jwks_url()),
        ])
    }
}
