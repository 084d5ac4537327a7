//! OAuth authorization-code broker handlers.
//!
//! The SPA never talks to the provider's token endpoint directly:
//!
//! ```text
//! GET  /auth/login     -> 302 to provider /authorize, state cookie set
//! GET  /auth/callback  -> state checked, 302 to SPA with ?code=
//! POST /auth/token     -> code exchanged server-side, TokenSet returned
//! POST /auth/refresh   -> refresh token exchanged, TokenSet returned
//! GET  /auth/logout    -> 302 to provider logout
//! ```

use crate::errors::GatewayError;
use crate::routes::AppState;
use crate::services::{generate_state, TokenSet};
use axum::{
    extract::{Query, State},
    http::{
        header::{CACHE_CONTROL, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use common::secret::SecretString;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Cookie carrying the OAuth `state` between login and callback.
pub const STATE_COOKIE: &str = "spa_oauth_state";

/// State cookie lifetime; a login must complete within this window.
const STATE_COOKIE_MAX_AGE_SECS: u64 = 600;

/// Query parameters the provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body of POST /auth/token.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub code: SecretString,
}

/// Body of POST /auth/refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: SecretString,
}

/// Handler for GET /auth/login
///
/// Generates a fresh `state`, stores it in an `HttpOnly; SameSite=Lax`
/// cookie scoped to `/auth`, and redirects to the provider.
#[instrument(skip_all, name = "gw.handlers.login")]
pub async fn login(State(state): State<Arc<AppState>>) -> Result<Response, GatewayError> {
    let oauth_state = generate_state()?;
    let authorize_url = state.identity_provider.authorize_url(&oauth_state)?;

    let cookie = state_cookie(
        &oauth_state,
        STATE_COOKIE_MAX_AGE_SECS,
        is_https(&state.config.public_base_url),
    );

    tracing::debug!(target: "gw.handlers.oauth", "Redirecting to identity provider");
    found(&authorize_url, Some(&cookie))
}

/// Handler for GET /auth/callback
///
/// - Provider `error` -> 302 to `<public base>/?error=<error>`
/// - Missing or mismatched `state` -> 400
/// - Otherwise -> state cookie cleared, 302 to `<public base>/?code=<code>`
#[instrument(skip_all, name = "gw.handlers.callback")]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, GatewayError> {
    let secure = is_https(&state.config.public_base_url);
    let clear = state_cookie("", 0, secure);

    if let Some(error) = params.error.as_deref() {
        tracing::info!(target: "gw.handlers.oauth", error = %error, "Identity provider returned an error to the callback");
        let target = spa_url(&state.config.public_base_url, "error", error)?;
        return found(&target, Some(&clear));
    }

    let expected = cookie_value(&headers, STATE_COOKIE);
    match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => {}
        _ => {
            tracing::warn!(target: "gw.handlers.oauth", "OAuth state missing or mismatched");
            return Err(GatewayError::BadRequest("OAuth state mismatch".to_string()));
        }
    }

    let code = params
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("Missing authorization code".to_string()))?;

    let target = spa_url(&state.config.public_base_url, "code", code)?;
    found(&target, Some(&clear))
}

/// Handler for POST /auth/token
///
/// Exchanges `{ "code": ... }` for a `TokenSet`.
#[instrument(skip_all, name = "gw.handlers.token")]
pub async fn exchange_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Response, GatewayError> {
    let tokens = state.identity_provider.exchange_code(&request.code).await?;
    Ok(no_store(tokens))
}

/// Handler for POST /auth/refresh
///
/// Exchanges `{ "refresh_token": ... }` for a fresh `TokenSet`.
#[instrument(skip_all, name = "gw.handlers.refresh")]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Response, GatewayError> {
    let tokens = state
        .identity_provider
        .refresh(&request.refresh_token)
        .await?;
    Ok(no_store(tokens))
}

/// Handler for GET /auth/logout
#[instrument(skip_all, name = "gw.handlers.logout")]
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Response, GatewayError> {
    let logout_url = state.identity_provider.logout_url()?;
    found(&logout_url, None)
}

/// Token responses must not be cached by the browser or intermediaries.
fn no_store(tokens: TokenSet) -> Response {
    let mut response = Json(tokens).into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// 302 Found with an optional Set-Cookie.
fn found(location: &str, cookie: Option<&str>) -> Result<Response, GatewayError> {
    let location = HeaderValue::from_str(location).map_err(|e| {
        tracing::error!(target: "gw.handlers.oauth", error = %e, "Redirect target is not a valid header value");
        GatewayError::Internal
    })?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(LOCATION, location);

    if let Some(cookie) = cookie {
        let cookie = HeaderValue::from_str(cookie).map_err(|_| GatewayError::Internal)?;
        response.headers_mut().insert(SET_COOKIE, cookie);
    }

    Ok(response)
}

fn is_https(public_base_url: &str) -> bool {
    public_base_url.starts_with("https://")
}

/// `Set-Cookie` value for the state cookie. Max-Age 0 clears it.
fn state_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{STATE_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/auth; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Find a cookie by name across all Cookie headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// `<public base>/?<key>=<value>`, with the value URL-encoded.
fn spa_url(public_base_url: &str, key: &str, value: &str) -> Result<String, GatewayError> {
    let mut url = Url::parse(&format!("{public_base_url}/")).map_err(|e| {
        GatewayError::Configuration(format!("Invalid PUBLIC_BASE_URL: {e}"))
    })?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url.into())
}
