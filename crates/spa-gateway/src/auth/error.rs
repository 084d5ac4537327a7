//! Bearer token verification failures.
//!
//! Every kind is terminal for the request. Display strings are for logs
//! only; the HTTP boundary answers every rejection with the same body.

use thiserror::Error;

/// Why a bearer token was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header, wrong scheme, or empty token.
    #[error("Authorization header is missing or not a bearer token")]
    MissingToken,

    /// Token could not be decoded without verification.
    #[error("The access token is malformed")]
    MalformedToken,

    /// Token `iss` names neither recognized identity provider.
    #[error("The access token issuer is not recognized")]
    UnknownIssuer,

    /// No published key verifies the token: the `kid` lookup failed, the key
    /// is unusable, or the signature does not match the key named by `kid`.
    #[error("The access token signing key could not be resolved")]
    KeyResolutionFailed,

    /// Token header declares an algorithm other than RS256.
    #[error("The access token algorithm is not supported")]
    UnsupportedAlgorithm,

    /// Signature verified but `exp`, `nbf`, `iat`, `aud`, `iss` or a required
    /// identity claim is wrong.
    #[error("The access token is invalid or expired")]
    InvalidClaims,

    /// The issuer's verification settings are not configured.
    #[error("Token verification is not configured for this issuer")]
    ConfigurationError,
}

impl AuthError {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownIssuer => "unknown_issuer",
            AuthError::KeyResolutionFailed => "key_resolution_failed",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::ConfigurationError => "configuration_error",
        }
    }
}

impl From<common::jwt::JwtValidationError> for AuthError {
    fn from(err: common::jwt::JwtValidationError) -> Self {
        use common::jwt::JwtValidationError;
        match err {
            JwtValidationError::TokenTooLarge
            | JwtValidationError::MalformedToken
            | JwtValidationError::MissingKid => AuthError::MalformedToken,
            JwtValidationError::IatTooFarInFuture => AuthError::InvalidClaims,
        }
    }
}
