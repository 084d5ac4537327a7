//! Health check handler.

use tracing::instrument;

/// Liveness probe.
///
/// Returns "OK" whenever the process can serve requests. It does not reach
/// out to the identity providers, so an Auth0 or Azure outage never takes
/// the gateway out of rotation.
#[instrument(skip_all, name = "gw.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}
