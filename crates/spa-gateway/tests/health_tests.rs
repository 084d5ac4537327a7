//! Health, metrics and static bundle integration tests.
//!
//! Uses the `TestGatewayServer` harness.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use spa_test_utils::TestGatewayServer;
use std::collections::HashMap;
use std::fs;

/// Test that health endpoint returns 200 and a plain body.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(HashMap::new()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that the health check needs no identity provider configuration.
#[tokio::test]
async fn test_health_without_any_issuer_configured() -> Result<(), anyhow::Error> {
    let vars = HashMap::from([("AZURE_JWKS_URL".to_string(), "http://127.0.0.1:9/keys".to_string())]);
    let server = TestGatewayServer::spawn(vars).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that the metrics endpoint answers in Prometheus text format.
#[tokio::test]
async fn test_metrics_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(HashMap::new()).await?;

    // Generate at least one request so the handle has something to render
    reqwest::get(format!("{}/health", server.url())).await?;
    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that the bundle is served and unknown paths fall back to index.html.
#[tokio::test]
async fn test_static_bundle_with_client_side_routing() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("index.html"), "<html>spa-index</html>")?;
    fs::create_dir(dir.path().join("assets"))?;
    fs::write(dir.path().join("assets").join("app.js"), "console.log('app');")?;

    let vars = HashMap::from([(
        "STATIC_DIR".to_string(),
        dir.path().to_string_lossy().to_string(),
    )]);
    let server = TestGatewayServer::spawn(vars).await?;

    let root = reqwest::get(format!("{}/", server.url())).await?;
    assert_eq!(root.status(), 200);
    assert!(root.text().await?.contains("spa-index"));

    let asset = reqwest::get(format!("{}/assets/app.js", server.url())).await?;
    assert_eq!(asset.status(), 200);
    assert_eq!(asset.text().await?, "console.log('app');");

    let deep_link = reqwest::get(format!("{}/settings/profile", server.url())).await?;
    assert_eq!(deep_link.status(), 200);
    assert!(deep_link.text().await?.contains("spa-index"));

    Ok(())
}

/// Test that API routes are not swallowed by the SPA fallback.
#[tokio::test]
async fn test_api_route_is_not_served_from_bundle() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("index.html"), "<html>spa-index</html>")?;

    let vars = HashMap::from([(
        "STATIC_DIR".to_string(),
        dir.path().to_string_lossy().to_string(),
    )]);
    let server = TestGatewayServer::spawn(vars).await?;

    let response = reqwest::get(format!("{}/api/me", server.url())).await?;

    assert_eq!(response.status(), 401);

    Ok(())
}
