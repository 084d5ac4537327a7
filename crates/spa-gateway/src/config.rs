//! SPA gateway configuration.
//!
//! Configuration is loaded from environment variables. Identity provider
//! settings are all optional at startup: a missing value disables the
//! affected issuer path, which then fails closed per request. The Auth0
//! client secret is a `SecretString` and is redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default externally visible base URL.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Default directory holding the SPA bundle.
pub const DEFAULT_STATIC_DIR: &str = "build";

/// Azure AD multi-tenant signing keys.
pub const DEFAULT_AZURE_JWKS_URL: &str =
    "https://login.microsoftonline.com/common/discovery/v2.0/keys";

/// Default JWKS cache TTL in seconds (5 minutes). Zero disables caching.
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Upper bound on the JWKS cache TTL, so revoked keys age out within an hour.
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// Default timeout for a single JWKS fetch.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound on the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// SPA gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Externally visible base URL, without trailing slash. Used to build the
    /// OAuth redirect URI and the post-logout return URL.
    pub public_base_url: String,

    /// Directory holding the SPA bundle.
    pub static_dir: String,

    /// Auth0 tenant domain (e.g. "example.auth0.com").
    pub auth0_domain: Option<String>,

    /// Auth0 application client ID.
    pub auth0_client_id: Option<String>,

    /// Auth0 application client secret.
    pub auth0_client_secret: Option<SecretString>,

    /// Auth0 API audience. Falls back to the client ID for `aud` checks.
    pub auth0_audience: Option<String>,

    /// Auth0 connection to force on login (e.g. an Azure AD enterprise connection).
    pub auth0_connection: Option<String>,

    /// Override for the Auth0 base URL (authorize, token, logout, JWKS).
    pub auth0_base_url: Option<String>,

    /// Expected `aud` for Azure AD access tokens.
    pub azure_audience: Option<String>,

    /// Azure AD JWKS endpoint.
    pub azure_jwks_url: String,

    /// JWT clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// How long fetched signing keys may be served from cache. Zero disables caching.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for a single JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("public_base_url", &self.public_base_url)
            .field("static_dir", &self.static_dir)
            .field("auth0_domain", &self.auth0_domain)
            .field("auth0_client_id", &self.auth0_client_id)
            .field(
                "auth0_client_secret",
                &self.auth0_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth0_audience", &self.auth0_audience)
            .field("auth0_connection", &self.auth0_connection)
            .field("auth0_base_url", &self.auth0_base_url)
            .field("azure_audience", &self.azure_audience)
            .field("azure_jwks_url", &self.azure_jwks_url)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field(
                "jwks_fetch_timeout_seconds",
                &self.jwks_fetch_timeout_seconds,
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),
}

/// Read a variable, treating empty and whitespace-only values as absent.
fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address =
            non_empty(vars, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let public_base_url = non_empty(vars, "PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let static_dir =
            non_empty(vars, "STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());

        let azure_jwks_url = non_empty(vars, "AZURE_JWKS_URL")
            .unwrap_or_else(|| DEFAULT_AZURE_JWKS_URL.to_string());

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = non_empty(vars, "JWT_CLOCK_SKEW_SECONDS")
        {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        // Parse JWKS cache TTL (zero is allowed and disables caching)
        let jwks_cache_ttl_seconds = if let Some(value_str) = non_empty(vars, "JWKS_CACHE_TTL_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_JWKS_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                    MAX_JWKS_CACHE_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_CACHE_TTL_SECONDS
        };

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = non_empty(vars, "JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        Ok(Config {
            bind_address,
            public_base_url,
            static_dir,
            auth0_domain: non_empty(vars, "AUTH0_DOMAIN"),
            auth0_client_id: non_empty(vars, "AUTH0_CLIENT_ID"),
            auth0_client_secret: non_empty(vars, "AUTH0_CLIENT_SECRET").map(SecretString::from),
            auth0_audience: non_empty(vars, "AUTH0_AUDIENCE"),
            auth0_connection: non_empty(vars, "AUTH0_CONNECTION"),
            auth0_base_url: non_empty(vars, "AUTH0_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            azure_audience: non_empty(vars, "AZURE_AUDIENCE"),
            azure_jwks_url,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
        })
    }

    /// Base URL for Auth0 endpoints: the override if set, else `https://<domain>`.
    pub fn auth0_base_url(&self) -> Option<String> {
        self.auth0_base_url.clone().or_else(|| {
            self.auth0_domain
                .as_ref()
                .map(|domain| format!("https://{}", domain))
        })
    }

    /// Auth0 JWKS endpoint, published under the tenant base URL.
    pub fn auth0_jwks_url(&self) -> Option<String> {
        self.auth0_base_url()
            .map(|base| format!("{}/.well-known/jwks.json", base))
    }

    /// Expected `aud` for Auth0 tokens: the API audience, else the client ID.
    pub fn auth0_expected_audience(&self) -> Option<String> {
        self.auth0_audience
            .clone()
            .or_else(|| self.auth0_client_id.clone())
    }

    /// OAuth redirect URI registered with Auth0.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_base_url)
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn jwt_clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds.unsigned_abs())
    }
}
