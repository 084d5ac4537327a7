//! Dual-issuer bearer token gate.
//!
//! Accepts RS256 access tokens minted by Azure AD or by the configured Auth0
//! tenant and turns them into an [`Identity`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The issuer is read from unverified claims only to pick a key source;
//!   every claim that ends up in an `Identity` has been verified
//! - Verification is pinned to RS256 regardless of the token header
//! - `exp` is required and `nbf` enforced for both issuers
//! - Raw tokens are never logged

use crate::auth::claims::{Identity, VerifiedClaims};
use crate::auth::error::AuthError;
use crate::auth::issuer::Issuer;
use crate::auth::jwks::{JwksClient, KeySource};
use crate::config::Config;
use crate::observability::metrics::record_token_verification;
use common::jwt::{decode_header, decode_payload, validate_iat, UnverifiedHeader};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// The only signature algorithm accepted from either issuer.
const ACCEPTED_ALG: &str = "RS256";

/// Verification expectations derived from configuration.
#[derive(Debug, Clone, Default)]
pub struct GateSettings {
    /// Auth0 tenant domain; enables Auth0 classification.
    pub auth0_domain: Option<String>,

    /// Expected Auth0 `aud` (API audience, else client ID).
    pub auth0_audience: Option<String>,

    /// Expected Azure AD `aud`.
    pub azure_audience: Option<String>,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,
}

impl GateSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth0_domain: config.auth0_domain.clone(),
            auth0_audience: config.auth0_expected_audience(),
            azure_audience: config.azure_audience.clone(),
            clock_skew: config.jwt_clock_skew(),
        }
    }

    /// Exact `iss` Auth0 stamps on this tenant's tokens.
    fn auth0_issuer(&self) -> Option<String> {
        self.auth0_domain
            .as_ref()
            .map(|domain| format!("https://{}/", domain))
    }
}

/// The only payload field read before verification.
#[derive(Deserialize)]
struct UnverifiedClaims {
    #[serde(default)]
    iss: Option<String>,
}

/// A token whose header and issuer have been read but not verified.
struct InspectedToken<'a> {
    token: &'a str,
    header: UnverifiedHeader,
    issuer: Issuer,
}

/// Issuer-specific inputs to signature and claim verification.
struct VerificationPlan {
    key_source: Arc<dyn KeySource>,
    validation: Validation,
}

/// Bearer token verification gate.
///
/// Holds no per-request state; concurrent `verify` calls are independent.
/// Key sources are injected so tests can substitute in-memory keys.
pub struct BearerTokenGate {
    settings: GateSettings,
    azure_keys: Arc<dyn KeySource>,
    auth0_keys: Option<Arc<dyn KeySource>>,
}

impl BearerTokenGate {
    /// Create a gate over explicit key sources.
    ///
    /// # Arguments
    ///
    /// * `settings` - Audiences, Auth0 domain and clock skew
    /// * `azure_keys` - Azure AD signing keys
    /// * `auth0_keys` - Auth0 signing keys; `None` fails Auth0 tokens closed
    pub fn new(
        settings: GateSettings,
        azure_keys: Arc<dyn KeySource>,
        auth0_keys: Option<Arc<dyn KeySource>>,
    ) -> Self {
        Self {
            settings,
            azure_keys,
            auth0_keys,
        }
    }

    /// Create a gate backed by HTTP JWKS clients for both issuers.
    pub fn from_config(config: &Config) -> Self {
        let cache_ttl = Duration::from_secs(config.jwks_cache_ttl_seconds);
        let fetch_timeout = Duration::from_secs(config.jwks_fetch_timeout_seconds);

        let azure_keys: Arc<dyn KeySource> = Arc::new(JwksClient::new(
            Issuer::AzureAd.as_str(),
            config.azure_jwks_url.clone(),
            cache_ttl,
            fetch_timeout,
        ));

        let auth0_keys = config.auth0_jwks_url().map(|url| {
            Arc::new(JwksClient::new(
                Issuer::Auth0.as_str(),
                url,
                cache_ttl,
                fetch_timeout,
            )) as Arc<dyn KeySource>
        });

        Self::new(GateSettings::from_config(config), azure_keys, auth0_keys)
    }

    /// Verify the raw `Authorization` header value.
    ///
    /// `None` means the header was absent.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered. Every kind is terminal.
    #[instrument(skip_all, name = "gw.auth.verify")]
    pub async fn verify(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let start = Instant::now();

        let (issuer_label, result) = match self.inspect(authorization) {
            Ok(inspected) => {
                let issuer = inspected.issuer;
                (issuer.as_str(), self.verify_inspected(inspected).await)
            }
            Err(e) => ("none", Err(e)),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.as_str(),
        };
        record_token_verification(issuer_label, outcome, start.elapsed());

        match &result {
            Ok(identity) => {
                tracing::debug!(target: "gw.auth.gate", issuer = issuer_label, provider = identity.provider(), "Token verified");
            }
            Err(e) => {
                tracing::debug!(target: "gw.auth.gate", issuer = issuer_label, reason = e.as_str(), "Token rejected");
            }
        }

        result
    }

    /// Steps that need no I/O: bearer extraction, unverified decode, classification.
    fn inspect<'a>(&self, authorization: Option<&'a str>) -> Result<InspectedToken<'a>, AuthError> {
        let token = extract_bearer_token(authorization)?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "gw.auth.gate", error = ?e, "Token header decode failed");
            AuthError::from(e)
        })?;
        let claims: UnverifiedClaims = decode_payload(token).map_err(|e| {
            tracing::debug!(target: "gw.auth.gate", error = ?e, "Token payload decode failed");
            AuthError::from(e)
        })?;

        let issuer = Issuer::classify(
            claims.iss.as_deref().unwrap_or_default(),
            self.settings.auth0_domain.as_deref(),
        );
        if issuer == Issuer::Unknown {
            return Err(AuthError::UnknownIssuer);
        }

        Ok(InspectedToken {
            token,
            header,
            issuer,
        })
    }

    async fn verify_inspected(&self, inspected: InspectedToken<'_>) -> Result<Identity, AuthError> {
        let plan = self.plan(inspected.issuer)?;

        let jwk = plan.key_source.get_key(&inspected.header.kid).await?;
        let decoding_key = jwk.decoding_key()?;

        if inspected.header.alg != ACCEPTED_ALG {
            tracing::debug!(
                target: "gw.auth.gate",
                alg = %inspected.header.alg,
                "Token declares unsupported algorithm"
            );
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let token_data = decode::<VerifiedClaims>(inspected.token, &decoding_key, &plan.validation)
            .map_err(|e| {
                tracing::debug!(target: "gw.auth.gate", error = %e, "Token verification failed");
                map_verification_error(e.kind())
            })?;
        let claims = token_data.claims;

        if let Some(iat) = claims.get("iat") {
            let iat = iat.as_i64().ok_or(AuthError::InvalidClaims)?;
            validate_iat(iat, self.settings.clock_skew)?;
        }

        match inspected.issuer {
            Issuer::AzureAd => Identity::from_azure_claims(&claims),
            Issuer::Auth0 => Ok(Identity::from_auth0_claims(claims)),
            Issuer::Unknown => Err(AuthError::UnknownIssuer),
        }
    }

    /// Pick the key source and claim expectations for `issuer`.
    ///
    /// Fails closed with `ConfigurationError` when the issuer's settings are absent.
    fn plan(&self, issuer: Issuer) -> Result<VerificationPlan, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        match issuer {
            Issuer::AzureAd => {
                let audience = self.settings.azure_audience.as_deref().ok_or_else(|| {
                    tracing::warn!(target: "gw.auth.gate", "Azure AD token received but AZURE_AUDIENCE is not configured");
                    AuthError::ConfigurationError
                })?;

                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "aud"]);

                Ok(VerificationPlan {
                    key_source: Arc::clone(&self.azure_keys),
                    validation,
                })
            }
            Issuer::Auth0 => {
                let (Some(audience), Some(issuer), Some(key_source)) = (
                    self.settings.auth0_audience.as_deref(),
                    self.settings.auth0_issuer(),
                    self.auth0_keys.as_ref(),
                ) else {
                    tracing::warn!(target: "gw.auth.gate", "Auth0 token received but Auth0 verification is not configured");
                    return Err(AuthError::ConfigurationError);
                };

                validation.set_audience(&[audience]);
                validation.set_issuer(&[issuer]);
                validation.set_required_spec_claims(&["exp", "aud", "iss"]);

                Ok(VerificationPlan {
                    key_source: Arc::clone(key_source),
                    validation,
                })
            }
            Issuer::Unknown => Err(AuthError::UnknownIssuer),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is case-insensitive. Anything other than exactly two
/// whitespace-separated segments is rejected.
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = authorization.ok_or(AuthError::MissingToken)?;

    let mut segments = header.split_whitespace();
    match (segments.next(), segments.next(), segments.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => {
            tracing::debug!(target: "gw.auth.gate", "Authorization header is not a single bearer token");
            Err(AuthError::MissingToken)
        }
    }
}

/// A signature that fails against the key named by `kid` means the token was
/// signed with a key the issuer does not publish.
fn map_verification_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthError::KeyResolutionFailed
        }
        ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::MalformedToken
        }
        _ => AuthError::InvalidClaims,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::Jwk;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Key source that counts lookups and never finds a key.
    #[derive(Default)]
    struct EmptyKeySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySource for EmptyKeySource {
        async fn get_key(&self, _kid: &str) -> Result<Jwk, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::KeyResolutionFailed)
        }
    }

    fn unsigned_token(header: &Value, claims: &Value) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    fn settings() -> GateSettings {
        GateSettings {
            auth0_domain: Some("example.auth0.com".to_string()),
            auth0_audience: Some("client123".to_string()),
            azure_audience: Some("api://tab".to_string()),
            clock_skew: Duration::from_secs(300),
        }
    }

    fn gate_with(settings: GateSettings, auth0: bool) -> (BearerTokenGate, Arc<EmptyKeySource>) {
        let keys = Arc::new(EmptyKeySource::default());
        let auth0_keys = auth0.then(|| Arc::clone(&keys) as Arc<dyn KeySource>);
        (
            BearerTokenGate::new(settings, Arc::clone(&keys) as Arc<dyn KeySource>, auth0_keys),
            keys,
        )
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(extract_bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(extract_bearer_token(Some("BEARER   abc  ")), Ok("abc"));
    }

    #[test]
    fn test_extract_bearer_token_rejects_bad_headers() {
        for header in [
            None,
            Some(""),
            Some("Bearer"),
            Some("Bearer "),
            Some("NotBearer xyz"),
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer abc def"),
        ] {
            assert_eq!(
                extract_bearer_token(header),
                Err(AuthError::MissingToken),
                "header = {header:?}"
            );
        }
    }

    #[test]
    fn test_verification_error_mapping() {
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidSignature),
            AuthError::KeyResolutionFailed
        );
        assert_eq!(
            map_verification_error(&ErrorKind::ExpiredSignature),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_verification_error(&ErrorKind::ImmatureSignature),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidAudience),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidIssuer),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_verification_error(&ErrorKind::MissingRequiredClaim("exp".to_string())),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidToken),
            AuthError::MalformedToken
        );
    }

    #[test]
    fn test_settings_from_config() {
        let vars = std::collections::HashMap::from([
            ("AUTH0_DOMAIN".to_string(), "example.auth0.com".to_string()),
            ("AUTH0_CLIENT_ID".to_string(), "client123".to_string()),
            ("JWT_CLOCK_SKEW_SECONDS".to_string(), "60".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let settings = GateSettings::from_config(&config);

        assert_eq!(settings.auth0_audience.as_deref(), Some("client123"));
        assert_eq!(
            settings.auth0_issuer().as_deref(),
            Some("https://example.auth0.com/")
        );
        assert!(settings.azure_audience.is_none());
        assert_eq!(settings.clock_skew, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_missing_kid_is_malformed() {
        let (gate, keys) = gate_with(settings(), true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256"}),
            &serde_json::json!({"iss": "https://example.auth0.com/"}),
        );

        let result = gate.verify(Some(&format!("Bearer {token}"))).await;

        assert_eq!(result, Err(AuthError::MalformedToken));
        assert_eq!(keys.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_is_malformed() {
        let (gate, _) = gate_with(settings(), true);

        assert_eq!(
            gate.verify(Some("Bearer not-a-jwt")).await,
            Err(AuthError::MalformedToken)
        );
        assert_eq!(
            gate.verify(Some("Bearer a.b.c")).await,
            Err(AuthError::MalformedToken)
        );
    }

    #[tokio::test]
    async fn test_oversized_token_is_malformed() {
        let (gate, _) = gate_with(settings(), true);
        let big = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);

        assert_eq!(
            gate.verify(Some(&format!("Bearer {big}"))).await,
            Err(AuthError::MalformedToken)
        );
    }

    #[tokio::test]
    async fn test_unknown_issuer_skips_key_lookup() {
        let (gate, keys) = gate_with(settings(), true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://accounts.google.com"}),
        );

        let result = gate.verify(Some(&format!("Bearer {token}"))).await;

        assert_eq!(result, Err(AuthError::UnknownIssuer));
        assert_eq!(keys.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_iss_is_unknown_issuer() {
        let (gate, _) = gate_with(settings(), true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"sub": "x"}),
        );

        assert_eq!(
            gate.verify(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::UnknownIssuer)
        );
    }

    #[tokio::test]
    async fn test_azure_without_audience_is_configuration_error() {
        let mut settings = settings();
        settings.azure_audience = None;
        let (gate, keys) = gate_with(settings, true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://sts.windows.net/tenant/"}),
        );

        let result = gate.verify(Some(&format!("Bearer {token}"))).await;

        assert_eq!(result, Err(AuthError::ConfigurationError));
        assert_eq!(keys.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth0_without_key_source_is_configuration_error() {
        let (gate, _) = gate_with(settings(), false);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://example.auth0.com/"}),
        );

        assert_eq!(
            gate.verify(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::ConfigurationError)
        );
    }

    #[tokio::test]
    async fn test_auth0_without_audience_is_configuration_error() {
        let mut settings = settings();
        settings.auth0_audience = None;
        let (gate, _) = gate_with(settings, true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://example.auth0.com/"}),
        );

        assert_eq!(
            gate.verify(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::ConfigurationError)
        );
    }

    #[tokio::test]
    async fn test_key_resolution_failure_propagates() {
        let (gate, keys) = gate_with(settings(), true);
        let token = unsigned_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://example.auth0.com/"}),
        );

        let result = gate.verify(Some(&format!("Bearer {token}"))).await;

        assert_eq!(result, Err(AuthError::KeyResolutionFailed));
        assert_eq!(keys.calls.load(Ordering::SeqCst), 1);
    }
}
