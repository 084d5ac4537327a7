//! Auth0 authorization-code broker.
//!
//! Builds the browser-facing authorize and logout URLs and performs the
//! back-channel token endpoint calls (code exchange, refresh) on behalf of
//! the SPA, so the client secret never reaches the browser.
//!
//! # Security
//!
//! - The client secret is held as a `SecretString` and only exposed into the
//!   form body of token endpoint requests
//! - Provider error bodies are logged at debug level, never returned
//! - Timeouts prevent hanging connections

use crate::config::Config;
use crate::errors::GatewayError;
use crate::observability::metrics::record_token_exchange;
use common::secret::{ExposeSecret, SecretString};
use reqwest::{Client, Url};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Timeout for token endpoint requests in seconds.
const TOKEN_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Scopes requested at login. `offline_access` yields a refresh token.
pub const LOGIN_SCOPE: &str = "openid profile email offline_access";

/// Bytes of CSPRNG output in an OAuth `state` value.
const STATE_BYTES: usize = 32;

/// Tokens returned by the provider's token endpoint.
///
/// Passed through to the SPA as JSON. Debug output redacts every token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

/// Auth0 application settings needed by the broker.
#[derive(Debug, Clone)]
pub struct Auth0Settings {
    /// `https://<domain>` or an override.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub audience: Option<String>,
    pub connection: Option<String>,
    /// Registered callback, `<public base>/auth/callback`.
    pub redirect_uri: String,
    /// Where the provider sends the browser after logout.
    pub logout_return_to: String,
}

impl Auth0Settings {
    /// Settings from configuration, or `None` when the tenant or client ID is missing.
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            base_url: config.auth0_base_url()?,
            client_id: config.auth0_client_id.clone()?,
            client_secret: config.auth0_client_secret.clone(),
            audience: config.auth0_audience.clone(),
            connection: config.auth0_connection.clone(),
            redirect_uri: config.callback_url(),
            logout_return_to: config.public_base_url.clone(),
        })
    }
}

/// HTTP client for the Auth0 authorization and token endpoints.
#[derive(Clone)]
pub struct IdentityProviderClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// `None` when Auth0 is not configured; every operation then fails closed.
    settings: Option<Auth0Settings>,
}

impl IdentityProviderClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(settings: Option<Auth0Settings>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TOKEN_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "gw.services.idp", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        if settings.is_none() {
            warn!(target: "gw.services.idp", "Auth0 is not configured; login endpoints will fail");
        }

        Ok(Self { client, settings })
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(Auth0Settings::from_config(config))
    }

    fn settings(&self) -> Result<&Auth0Settings, GatewayError> {
        self.settings.as_ref().ok_or_else(|| {
            GatewayError::Configuration("AUTH0_DOMAIN and AUTH0_CLIENT_ID are required".to_string())
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let settings = self.settings()?;
        Url::parse(&format!("{}{}", settings.base_url, path)).map_err(|e| {
            GatewayError::Configuration(format!("Invalid Auth0 base URL: {e}"))
        })
    }

    /// Browser redirect target that starts an authorization-code login.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` if Auth0 is not configured.
    pub fn authorize_url(&self, state: &str) -> Result<String, GatewayError> {
        let settings = self.settings()?;
        let mut url = self.endpoint("/authorize")?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &settings.client_id)
                .append_pair("redirect_uri", &settings.redirect_uri)
                .append_pair("scope", LOGIN_SCOPE)
                .append_pair("state", state);
            if let Some(audience) = &settings.audience {
                query.append_pair("audience", audience);
            }
            if let Some(connection) = &settings.connection {
                query.append_pair("connection", connection);
            }
        }

        Ok(url.into())
    }

    /// Provider logout URL that returns the browser to the SPA.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` if Auth0 is not configured.
    pub fn logout_url(&self) -> Result<String, GatewayError> {
        let settings = self.settings()?;
        let mut url = self.endpoint("/v2/logout")?;

        url.query_pairs_mut()
            .append_pair("client_id", &settings.client_id)
            .append_pair("returnTo", &settings.logout_return_to);

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Configuration` if Auth0 or its client secret is not configured
    /// - `GatewayError::InvalidGrant` if the provider rejects the code (4xx)
    /// - `GatewayError::ServiceUnavailable` if the provider is unreachable,
    ///   returns 5xx, or returns an unparseable body
    #[instrument(skip_all, name = "gw.services.idp.exchange_code")]
    pub async fn exchange_code(&self, code: &SecretString) -> Result<TokenSet, GatewayError> {
        let settings = self.settings()?;
        self.token_request(
            "authorization_code",
            &[
                ("code", code.expose_secret()),
                ("redirect_uri", settings.redirect_uri.as_str()),
            ],
        )
        .await
    }

    /// Trade a refresh token for a fresh token set.
    ///
    /// # Errors
    ///
    /// Same as [`IdentityProviderClient::exchange_code`].
    #[instrument(skip_all, name = "gw.services.idp.refresh")]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenSet, GatewayError> {
        self.token_request(
            "refresh_token",
            &[("refresh_token", refresh_token.expose_secret())],
        )
        .await
    }

    /// POST a grant to `/oauth/token`.
    async fn token_request(
        &self,
        grant_type: &'static str,
        grant_params: &[(&str, &str)],
    ) -> Result<TokenSet, GatewayError> {
        let settings = self.settings()?;
        let client_secret = settings.client_secret.as_ref().ok_or_else(|| {
            GatewayError::Configuration("AUTH0_CLIENT_SECRET is required".to_string())
        })?;
        let url = self.endpoint("/oauth/token")?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", grant_type),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", client_secret.expose_secret()),
        ];
        form.extend_from_slice(grant_params);

        let start = Instant::now();
        let result = match self.client.post(url).form(&form).send().await {
            Ok(response) => handle_response(response).await,
            Err(e) => {
                warn!(target: "gw.services.idp", error = %e, "Token endpoint request failed");
                Err(GatewayError::ServiceUnavailable(
                    "Identity provider is unavailable".to_string(),
                ))
            }
        };

        let status = match &result {
            Ok(_) => "success",
            Err(GatewayError::InvalidGrant(_)) => "rejected",
            Err(_) => "unavailable",
        };
        record_token_exchange(grant_type, status, start.elapsed());

        result
    }
}

/// Map a token endpoint response to a `TokenSet` or an error.
async fn handle_response(response: reqwest::Response) -> Result<TokenSet, GatewayError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            error!(target: "gw.services.idp", error = %e, "Failed to parse token endpoint response");
            GatewayError::ServiceUnavailable("Identity provider returned an invalid response".to_string())
        })
    } else if status.is_client_error() {
        let error_body = response.text().await.unwrap_or_default();
        tracing::debug!(target: "gw.services.idp", status = %status, body = %error_body, "Token endpoint rejected grant");
        Err(GatewayError::InvalidGrant(format!(
            "Identity provider rejected grant with status {status}"
        )))
    } else {
        warn!(target: "gw.services.idp", status = %status, "Token endpoint returned error");
        Err(GatewayError::ServiceUnavailable(
            "Identity provider is unavailable".to_string(),
        ))
    }
}

/// Generate an OAuth `state` value: 32 CSPRNG bytes, hex-encoded.
///
/// # Errors
///
/// Returns `GatewayError::Internal` if the system RNG fails.
pub fn generate_state() -> Result<String, GatewayError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; STATE_BYTES];
    rng.fill(&mut bytes).map_err(|_| {
        error!(target: "gw.services.idp", "System RNG failed to generate OAuth state");
        GatewayError::Internal
    })?;
    Ok(hex::encode(bytes))
}
