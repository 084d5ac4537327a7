//! Current caller handler.
//!
//! Echoes the identity the auth middleware verified.

use crate::auth::Identity;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/me
///
/// Requires valid authentication via the auth middleware.
///
/// ## Response
///
/// Returns 200 OK with the normalized identity. For an Azure AD token:
///
/// ```json
/// {
///   "provider": "azure",
///   "oid": "00000000-0000-0000-0000-000000000001",
///   "tid": "72f988bf-86f1-41af-91ab-2d7cd011db47",
///   "email": "alice@contoso.com"
/// }
/// ```
///
/// For an Auth0 token, `provider` is `"auth0"` and every verified claim
/// follows it.
#[instrument(skip_all, name = "gw.handlers.me")]
pub async fn get_me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    tracing::debug!(target: "gw.handlers.me", provider = identity.provider(), "Returning caller identity");
    Json(identity)
}
