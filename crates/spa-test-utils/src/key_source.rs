//! In-memory signing key source.

use async_trait::async_trait;
use spa_gateway::auth::{AuthError, Jwk, KeySource};
use std::sync::atomic::{AtomicUsize, Ordering};

/// `KeySource` over a fixed key list.
///
/// Counts lookups so tests can assert whether the gate reached key
/// resolution at all.
#[derive(Debug, Default)]
pub struct StaticKeySource {
    keys: Vec<Jwk>,
    lookups: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self {
            keys,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of `get_key` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.keys
            .iter()
            .find(|key| key.kid.as_deref() == Some(kid))
            .cloned()
            .ok_or(AuthError::KeyResolutionFailed)
    }
}
