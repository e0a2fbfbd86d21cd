//! Resource creation, resolution and administration.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::counter_aggregator::{CounterAggregator, PENDING_PREFIX, SyncReport};
use super::identifier_generator::IdentifierGenerator;
use super::resolution_cache::ResolutionCache;
use crate::domain::entities::{
    HistoryQuery, NewResource, Representation, ResourceKind, ResourceView,
};
use crate::domain::hit_event::HitEvent;
use crate::domain::hit_worker::HitDispatcher;
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{FastStore, StoreStats};
use crate::infrastructure::title_fetcher::TitleFetcher;
use crate::utils::url_normalizer::normalize_url;

/// Inserts attempted when a freshly generated identifier loses an insert race.
const INSERT_ATTEMPTS: u32 = 3;

/// How a resolution was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Redirect or scan. Always counted.
    Traverse,
    /// Info or image lookup. Counted only with `count_info_reads`.
    Inspect,
}

/// Service-level settings taken from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub count_info_reads: bool,
    pub title_timeout: Duration,
}

/// Composition root for the three resource kinds.
///
/// Kind-specific behaviour lives on [`ResourceKind`]; everything here is
/// shared by short links, QR codes and barcodes.
pub struct ResourceService {
    repository: Arc<dyn ResourceRepository>,
    store: Arc<dyn FastStore>,
    cache: Arc<ResolutionCache>,
    counters: Arc<CounterAggregator>,
    generator: IdentifierGenerator,
    title_fetcher: Arc<dyn TitleFetcher>,
    hits: HitDispatcher,
    settings: ServiceSettings,
}

impl ResourceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn ResourceRepository>,
        store: Arc<dyn FastStore>,
        cache: Arc<ResolutionCache>,
        counters: Arc<CounterAggregator>,
        generator: IdentifierGenerator,
        title_fetcher: Arc<dyn TitleFetcher>,
        hits: HitDispatcher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repository,
            store,
            cache,
            counters,
            generator,
            title_fetcher,
            hits,
            settings,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub fn hits(&self) -> &HitDispatcher {
        &self.hits
    }

    /// Creates a resource pointing at `target_url`.
    ///
    /// The URL is normalized first. The page title is looked up best-effort
    /// and bounded by the configured timeout. A generated identifier that
    /// loses an insert race is replaced, a bounded number of times.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a malformed or non-HTTP(S) URL
    /// - [`AppError::DuplicateId`] when no free identifier can be found
    /// - [`AppError::Unavailable`] when the durable store is unreachable
    pub async fn create(
        &self,
        kind: ResourceKind,
        target_url: &str,
        owner_id: Option<i64>,
    ) -> Result<ResourceView, AppError> {
        let target_url = normalize_url(target_url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let title = tokio::time::timeout(
            self.settings.title_timeout,
            self.title_fetcher.fetch_title(&target_url),
        )
        .await
        .unwrap_or_else(|_| {
            tracing::debug!(url = %target_url, "Title lookup timed out");
            None
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            let code = self.generator.generate(kind).await?;

            let new_resource = NewResource {
                kind,
                code,
                target_url: target_url.clone(),
                title: title.clone(),
                owner_id,
            };

            match self.repository.create_resource(new_resource).await {
                Ok(resource) => {
                    let view = ResourceView::from(resource);
                    self.cache.prime(&view).await;

                    tracing::info!(%kind, code = %view.code, "Resource created");
                    metrics::counter!("resources_created_total", "kind" => kind.as_str())
                        .increment(1);

                    return Ok(view);
                }
                Err(AppError::DuplicateId { .. }) if attempt < INSERT_ATTEMPTS => {
                    tracing::warn!(%kind, attempt, "Identifier taken at insert, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolves an identifier, counts the access when it should be counted,
    /// and returns the view with pending hits included.
    ///
    /// The hit is queued, not awaited, so the returned count may not yet
    /// include this access.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the identifier does not exist in `kind`
    /// - [`AppError::Unavailable`] when the durable store is needed and unreachable
    pub async fn resolve_and_count(
        &self,
        kind: ResourceKind,
        code: &str,
        access: Access,
    ) -> Result<ResourceView, AppError> {
        let mut view = self.cache.resolve(kind, code).await?.ok_or_else(|| {
            AppError::not_found(
                format!("{} not found", kind.display_name()),
                json!({ "kind": kind, "code": code }),
            )
        })?;

        let counts = match access {
            Access::Traverse => true,
            Access::Inspect => self.settings.count_info_reads,
        };
        if counts {
            self.hits.dispatch(HitEvent::new(kind, code));
        }

        view.hits += self.counters.pending(kind, code).await;
        Ok(view)
    }

    /// One page of an owner's resources of `kind`, with the owner's total.
    ///
    /// Listing is not an access and counts nothing. Each view includes its
    /// pending hits; ordering by hits uses the durable counts.
    pub async fn history(
        &self,
        kind: ResourceKind,
        query: HistoryQuery,
    ) -> Result<(Vec<ResourceView>, i64), AppError> {
        let page = self.repository.list_by_owner(kind, query).await?;

        let mut views = Vec::with_capacity(page.items.len());
        for resource in page.items {
            let mut view = ResourceView::from(resource);
            view.hits += self.counters.pending(kind, &view.code).await;
            views.push(view);
        }

        Ok((views, page.total))
    }

    /// Kind-specific representation of a resolved resource.
    pub fn render(&self, kind: ResourceKind, view: &ResourceView) -> Representation {
        kind.render(view, &self.settings.base_url)
    }

    /// Flushes every pending counter.
    pub async fn sync_all_counters(&self) -> Result<SyncReport, AppError> {
        self.counters.force_sync_all().await
    }

    pub async fn cache_stats(&self) -> Result<StoreStats, AppError> {
        self.store.stats().await.map_err(|e| {
            AppError::unavailable("Fast store unavailable", json!({ "reason": e.to_string() }))
        })
    }

    /// Removes fast store keys under `prefix`.
    ///
    /// Pending counters are excluded: they hold hits not yet written durably
    /// and must be synced instead.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty prefix or one that
    /// overlaps pending counters.
    pub async fn clear_cache_prefix(&self, prefix: &str) -> Result<u64, AppError> {
        if prefix.is_empty() {
            return Err(AppError::bad_request(
                "Prefix must not be empty",
                json!({ "prefix": prefix }),
            ));
        }
        if PENDING_PREFIX.starts_with(prefix) || prefix.starts_with(PENDING_PREFIX) {
            return Err(AppError::bad_request(
                "Pending counters cannot be cleared; sync them instead",
                json!({ "prefix": prefix }),
            ));
        }

        let removed = self.store.delete_prefix(prefix).await.map_err(|e| {
            AppError::unavailable("Fast store unavailable", json!({ "reason": e.to_string() }))
        })?;

        tracing::info!(prefix, removed, "Cache prefix cleared");
        Ok(removed)
    }
}
