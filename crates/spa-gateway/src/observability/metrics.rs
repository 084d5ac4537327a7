//! Metrics definitions for the SPA gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix for the gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: fixed route list, everything else is `/static` or `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `issuer`: azure, auth0, none
//! - `outcome`: success or an `AuthError` label
//! - `grant_type`: authorization_code, refresh_token

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets aligned with a 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("gw_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Verification is dominated by JWKS fetches on a cold cache
        .set_buckets_for_metric(
            Matcher::Prefix("gw_token_verification".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gw_jwks_fetch".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gw_token_exchange".to_string()),
            &[0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set token exchange buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 415 (wrong Content-Type), 400 (JSON parse errors) and 405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    // Normalize endpoint to prevent cardinality explosion
    let normalized_endpoint = normalize_endpoint(endpoint);

    // Determine status category for simplified querying
    let status = categorize_status_code(status_code);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// API and auth routes keep their path. Anything that looks like a bundle
/// asset collapses to `/static`; every other path is `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/me" => "/api/me",
        "/auth/login" => "/auth/login",
        "/auth/callback" => "/auth/callback",
        "/auth/token" => "/auth/token",
        "/auth/refresh" => "/auth/refresh",
        "/auth/logout" => "/auth/logout",
        _ if path.starts_with("/api/") || path.starts_with("/auth/") => "/other",
        _ => "/static",
    }
}

// ============================================================================
// Token Verification Metrics
// ============================================================================

/// Record a bearer token verification
///
/// Metric: `gw_token_verifications_total`, `gw_token_verification_duration_seconds`
/// Labels: `issuer`, `outcome`
///
/// `issuer` is `none` when the token was rejected before classification.
pub fn record_token_verification(issuer: &'static str, outcome: &'static str, duration: Duration) {
    histogram!("gw_token_verification_duration_seconds",
        "issuer" => issuer
    )
    .record(duration.as_secs_f64());

    counter!("gw_token_verifications_total",
        "issuer" => issuer,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS document fetch
///
/// Metric: `gw_jwks_fetches_total`, `gw_jwks_fetch_duration_seconds`
/// Labels: `issuer`, `status`
pub fn record_jwks_fetch(issuer: &'static str, status: &'static str, duration: Duration) {
    histogram!("gw_jwks_fetch_duration_seconds",
        "issuer" => issuer
    )
    .record(duration.as_secs_f64());

    counter!("gw_jwks_fetches_total",
        "issuer" => issuer,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Identity Provider Metrics
// ============================================================================

/// Record a token endpoint call to the identity provider
///
/// Metric: `gw_token_exchanges_total`, `gw_token_exchange_duration_seconds`
/// Labels: `grant_type`, `status`
///
/// `status` is `success`, `rejected` (provider 4xx) or `unavailable`.
pub fn record_token_exchange(grant_type: &'static str, status: &'static str, duration: Duration) {
    histogram!("gw_token_exchange_duration_seconds",
        "grant_type" => grant_type
    )
    .record(duration.as_secs_f64());

    counter!("gw_token_exchanges_total",
        "grant_type" => grant_type,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests exercise recording without an installed recorder; the
    // metrics facade turns every call into a no-op, so they must not panic.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/api/me", 401, Duration::from_millis(10));
        record_http_request("POST", "/auth/token", 400, Duration::from_millis(80));
        record_http_request("GET", "/auth/login", 302, Duration::from_millis(1));
        record_http_request("GET", "/assets/index-3f2a.js", 200, Duration::from_millis(2));
        record_http_request("GET", "/api/me", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        // Success codes, redirects included
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(302), "success");

        // Timeout codes
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");

        // Error codes
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(503), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/api/me"), "/api/me");
        assert_eq!(normalize_endpoint("/auth/callback"), "/auth/callback");
        assert_eq!(normalize_endpoint("/auth/refresh"), "/auth/refresh");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/api/unknown"), "/other");
        assert_eq!(normalize_endpoint("/auth/whatever"), "/other");
        assert_eq!(normalize_endpoint("/static/js/main.abc123.js"), "/static");
        assert_eq!(normalize_endpoint("/settings/profile"), "/static");
    }

    #[test]
    fn test_record_token_verification() {
        record_token_verification("auth0", "success", Duration::from_millis(3));
        record_token_verification("azure", "invalid_claims", Duration::from_millis(2));
        record_token_verification("none", "missing_token", Duration::from_micros(10));
    }

    #[test]
    fn test_record_jwks_fetch() {
        record_jwks_fetch("azure", "success", Duration::from_millis(120));
        record_jwks_fetch("auth0", "error", Duration::from_secs(5));
    }

    #[test]
    fn test_record_token_exchange() {
        record_token_exchange("authorization_code", "success", Duration::from_millis(300));
        record_token_exchange("refresh_token", "rejected", Duration::from_millis(90));
        record_token_exchange("refresh_token", "unavailable", Duration::from_secs(10));
    }
}
