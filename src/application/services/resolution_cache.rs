//! Cache-aside resolution of identifiers to resources.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{ResourceKind, ResourceView};
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;
use crate::infrastructure::cache::FastStore;

/// Fast store key of a cached resource view, e.g. `qrcode:Xk4mP9a`.
pub fn cache_key(kind: ResourceKind, code: &str) -> String {
    format!("{}:{}", kind.as_str(), code)
}

/// Resolves identifiers through the fast store, falling back to the durable
/// store.
///
/// The fast store is never authoritative and its failures never reach the
/// caller: a failed or timed-out read is treated as a miss and the fill is
/// skipped. Absent resources are not cached, so an identifier created after a
/// failed lookup resolves on the next request.
pub struct ResolutionCache {
    store: Arc<dyn FastStore>,
    repository: Arc<dyn ResourceRepository>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(
        store: Arc<dyn FastStore>,
        repository: Arc<dyn ResourceRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            repository,
            ttl,
        }
    }

    /// Resolves `code` within `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] only when the durable store has to be
    /// consulted and cannot be reached.
    pub async fn resolve(
        &self,
        kind: ResourceKind,
        code: &str,
    ) -> Result<Option<ResourceView>, AppError> {
        let key = cache_key(kind, code);
        let mut fill = true;

        match self.store.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<ResourceView>(&bytes) {
                Ok(view) => {
                    metrics::counter!("cache_lookups_total", "result" => "hit").increment(1);
                    tracing::debug!(%kind, code, "Cache HIT");
                    return Ok(Some(view));
                }
                Err(e) => {
                    tracing::warn!(%kind, code, error = %e, "Undecodable cache entry, reloading");
                    metrics::counter!("cache_lookups_total", "result" => "corrupt").increment(1);
                }
            },
            Ok(None) => {
                metrics::counter!("cache_lookups_total", "result" => "miss").increment(1);
                tracing::debug!(%kind, code, "Cache MISS");
            }
            Err(e) => {
                metrics::counter!("cache_lookups_total", "result" => "fallback").increment(1);
                tracing::warn!(%kind, code, error = %e, "Fast store read failed, using durable store");
                fill = false;
            }
        }

        let Some(resource) = self.repository.get_resource(kind, code).await? else {
            return Ok(None);
        };
        let view = ResourceView::from(resource);

        if fill {
            self.write(&key, &view).await;
        }

        Ok(Some(view))
    }

    /// Stores a freshly created resource so the first resolution is a hit.
    pub async fn prime(&self, view: &ResourceView) {
        self.write(&cache_key(view.kind, &view.code), view).await;
    }

    /// Drops the cached view so the next resolution reloads it.
    pub async fn invalidate(&self, kind: ResourceKind, code: &str) {
        if let Err(e) = self.store.delete(&cache_key(kind, code)).await {
            tracing::warn!(%kind, code, error = %e, "Failed to invalidate cache entry");
        }
    }

    async fn write(&self, key: &str, view: &ResourceView) {
        let bytes = match serde_json::to_vec(view) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to serialize resource view");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &bytes, self.ttl).await {
            tracing::warn!(key, error = %e, "Failed to cache resource view");
        }
    }
}
