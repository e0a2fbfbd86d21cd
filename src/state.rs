//! Shared application state injected into every handler.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::application::services::{RateLimiter, ResourceService};
use crate::domain::repositories::ResourceRepository;
use crate::infrastructure::cache::FastStore;

/// Handles the HTTP layer needs. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub resource_service: Arc<ResourceService>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Durable store, used directly only by the health check.
    pub repository: Arc<dyn ResourceRepository>,
    /// Fast store, used directly only by the health check.
    pub store: Arc<dyn FastStore>,
    pub behind_proxy: bool,
    admin_token_digest: Option<[u8; 32]>,
}

impl AppState {
    pub fn new(
        resource_service: Arc<ResourceService>,
        rate_limiter: Arc<RateLimiter>,
        repository: Arc<dyn ResourceRepository>,
        store: Arc<dyn FastStore>,
        behind_proxy: bool,
    ) -> Self {
        Self {
            resource_service,
            rate_limiter,
            repository,
            store,
            behind_proxy,
            admin_token_digest: None,
        }
    }

    /// Enables the admin surface. Only the SHA-256 digest of `token` is kept.
    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.admin_token_digest = Some(hash_token(token));
        self
    }

    pub fn admin_enabled(&self) -> bool {
        self.admin_token_digest.is_some()
    }

    /// Checks a presented bearer token against the configured admin token.
    ///
    /// Digests are compared without early exit.
    pub fn verify_admin_token(&self, presented: &str) -> bool {
        let Some(expected) = self.admin_token_digest else {
            return false;
        };

        let actual = hash_token(presented);
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn hash_token(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable() {
        assert_eq!(hash_token("secret"), hash_token("secret"));
        assert_ne!(hash_token("secret"), hash_token("Secret"));
    }
}
