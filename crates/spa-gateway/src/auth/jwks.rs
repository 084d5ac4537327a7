//! Signing key resolution from JWKS endpoints.
//!
//! Each issuer publishes its RSA signing keys as a JSON Web Key Set. The gate
//! asks a [`KeySource`] for the key named by a token's `kid`; the production
//! source is [`JwksClient`], which fetches the issuer's JWKS document over
//! HTTPS with an explicit timeout and optionally caches it.
//!
//! # Caching
//!
//! - A TTL of zero disables the cache: every lookup fetches the document
//! - Within the TTL, a hit is served from memory
//! - A miss against a fresh cache re-fetches at most once per
//!   [`MIN_REFETCH_INTERVAL`], so rotated keys are picked up without letting
//!   tokens with random `kid`s drive a fetch per request
//! - Nothing is retried; a failed fetch fails the lookup

use crate::auth::error::AuthError;
use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Minimum spacing between fetches triggered by an unknown `kid`.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

/// JSON Web Key from a JWKS document.
///
/// Only RSA keys (`kty = "RSA"`) with modulus and exponent can verify tokens.
/// Other key types are tolerated in the document and rejected when selected.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type ("RSA" for usable keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm, when the issuer publishes one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Build an RSA verification key from this JWK.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyResolutionFailed` if the key is not an RSA
    /// signing key or its components cannot be decoded.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        if self.kty != "RSA" {
            tracing::warn!(target: "gw.auth.jwks", kty = %self.kty, "JWK is not an RSA key");
            return Err(AuthError::KeyResolutionFailed);
        }
        if let Some(key_use) = &self.key_use {
            if key_use != "sig" {
                tracing::warn!(target: "gw.auth.jwks", key_use = %key_use, "JWK is not a signing key");
                return Err(AuthError::KeyResolutionFailed);
            }
        }

        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            tracing::warn!(target: "gw.auth.jwks", "RSA JWK is missing n or e");
            return Err(AuthError::KeyResolutionFailed);
        };

        DecodingKey::from_rsa_components(n, e).map_err(|err| {
            tracing::warn!(target: "gw.auth.jwks", error = %err, "Invalid RSA key components");
            AuthError::KeyResolutionFailed
        })
    }
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Resolves a signing key by `kid`.
///
/// Implemented by [`JwksClient`] in production and by in-memory sources in
/// tests. One source serves exactly one issuer.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Return the JWK published under `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyResolutionFailed` when the key set cannot be
    /// obtained or contains no key with this `kid`.
    async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError>;
}

/// Cached JWKS data with expiry time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this cache entry expires.
    expires_at: Instant,

    /// When the document was fetched.
    fetched_at: Instant,
}

/// Fetches and optionally caches one issuer's JWKS document.
pub struct JwksClient {
    /// Issuer label for logs and metrics.
    source: &'static str,

    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Cache TTL duration. Zero disables caching.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `source` - Issuer label ("azure", "auth0") used in logs and metrics
    /// * `jwks_url` - URL to the issuer's JWKS endpoint
    /// * `cache_ttl` - How long to serve a fetched document; zero disables caching
    /// * `fetch_timeout` - Timeout for one fetch, connect included
    pub fn new(
        source: &'static str,
        jwks_url: String,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gw.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            source,
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Fetch and parse the JWKS document.
    #[instrument(skip(self), fields(source = self.source))]
    async fn fetch(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        tracing::debug!(target: "gw.auth.jwks", url = %self.jwks_url, "Fetching JWKS");
        let start = Instant::now();

        let result = self.fetch_inner().await;

        record_jwks_fetch(
            self.source,
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );

        result
    }

    async fn fetch_inner(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gw.auth.jwks", source = self.source, error = %e, "Failed to fetch JWKS");
                AuthError::KeyResolutionFailed
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gw.auth.jwks",
                source = self.source,
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeyResolutionFailed);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "gw.auth.jwks", source = self.source, error = %e, "Failed to parse JWKS response");
            AuthError::KeyResolutionFailed
        })?;

        // Keys without a kid can never be selected
        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect();

        tracing::info!(
            target: "gw.auth.jwks",
            source = self.source,
            key_count = keys.len(),
            "JWKS fetched"
        );

        Ok(keys)
    }

    /// Fetch the document and replace the cache with it.
    ///
    /// The write lock is held across the fetch, so lookups that missed
    /// together wait for one fetch and then read its result.
    async fn refresh_cache(&self, kid: &str) -> Result<(), AuthError> {
        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.as_ref() {
            let now = Instant::now();
            let refreshed_while_waiting = cached.expires_at > now
                && (cached.keys.contains_key(kid)
                    || now.duration_since(cached.fetched_at) < MIN_REFETCH_INTERVAL);
            if refreshed_while_waiting {
                tracing::debug!(target: "gw.auth.jwks", source = self.source, kid = %kid, "JWKS refreshed by a concurrent lookup");
                return Ok(());
            }
        }

        let keys = self.fetch().await?;
        let now = Instant::now();
        *cache = Some(CachedJwks {
            keys,
            expires_at: now + self.cache_ttl,
            fetched_at: now,
        });

        Ok(())
    }

    /// Look `kid` up in the cache.
    ///
    /// `Ok(Some)` is a hit, `Ok(None)` means a fetch is needed, and
    /// `Err` means the cache is fresh, lacks the key, and was fetched too
    /// recently to fetch again.
    async fn lookup_cached(&self, kid: &str) -> Result<Option<Jwk>, AuthError> {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Ok(None);
        };

        let now = Instant::now();
        if cached.expires_at <= now {
            return Ok(None);
        }

        if let Some(key) = cached.keys.get(kid) {
            tracing::debug!(target: "gw.auth.jwks", source = self.source, kid = %kid, "JWKS cache hit");
            return Ok(Some(key.clone()));
        }

        if now.duration_since(cached.fetched_at) < MIN_REFETCH_INTERVAL {
            tracing::debug!(
                target: "gw.auth.jwks",
                source = self.source,
                kid = %kid,
                "Key not found in fresh JWKS cache; refetch throttled"
            );
            return Err(AuthError::KeyResolutionFailed);
        }

        tracing::debug!(target: "gw.auth.jwks", source = self.source, kid = %kid, "Key not found in JWKS cache; refetching");
        Ok(None)
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait]
impl KeySource for JwksClient {
    #[instrument(skip(self), fields(source = self.source, kid = %kid))]
    async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        // Caching disabled: one fetch per lookup
        if self.cache_ttl.is_zero() {
            let keys = self.fetch().await?;
            return keys.get(kid).cloned().ok_or_else(|| {
                tracing::warn!(target: "gw.auth.jwks", source = self.source, kid = %kid, "Key not found in JWKS");
                AuthError::KeyResolutionFailed
            });
        }

        if let Some(key) = self.lookup_cached(kid).await? {
            return Ok(key);
        }

        self.refresh_cache(kid).await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        // Key not found even after refresh
        tracing::warn!(target: "gw.auth.jwks", source = self.source, kid = %kid, "Key not found in JWKS after refresh");
        Err(AuthError::KeyResolutionFailed)
    }
}
