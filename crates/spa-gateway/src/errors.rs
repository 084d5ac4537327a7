//! SPA gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// SPA gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - BadRequest, InvalidGrant: 400 Bad Request
/// - ServiceUnavailable: 503 Service Unavailable
/// - Configuration, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal,
}

/// Body message for every 401.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidToken(_) => 401,
            GatewayError::BadRequest(_) | GatewayError::InvalidGrant(_) => 400,
            GatewayError::ServiceUnavailable(_) => 503,
            GatewayError::Configuration(_) | GatewayError::Internal => 500,
        }
    }
}

/// Bearer verification failures surface as 401, except a missing issuer
/// configuration, which is the server's fault.
impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ConfigurationError => GatewayError::Configuration(err.to_string()),
            _ => GatewayError::InvalidToken(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::InvalidToken(reason) => {
                // One body for every rejection; the kind stays in the log
                tracing::debug!(target: "gw.errors", reason = %reason, "Bearer token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    INVALID_TOKEN_MESSAGE.to_string(),
                )
            }
            GatewayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            GatewayError::InvalidGrant(reason) => {
                // Provider detail stays in the log
                tracing::debug!(target: "gw.errors", reason = %reason, "Grant rejected by identity provider");
                (
                    StatusCode::BAD_REQUEST,
                    "INVALID_GRANT",
                    "The authorization grant is invalid or expired".to_string(),
                )
            }
            GatewayError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gw.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            GatewayError::Configuration(reason) => {
                tracing::error!(target: "gw.config", reason = %reason, "Request failed on missing configuration");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "The server is not configured to handle this request".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"spa-gateway\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
