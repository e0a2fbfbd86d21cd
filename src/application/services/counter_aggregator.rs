//! Batched hit counting.
//!
//! Hits accumulate in the fast store under `pending:<kind>:<code>` and are
//! moved to the durable counter in batches. A threshold batch is claimed with
//! an atomic conditional decrement and a full sync with an atomic
//! read-and-reset, so each pending hit is owned by exactly one flusher and is
//! added to the durable counter once.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;

use super::resolution_cache::ResolutionCache;
use crate::domain::entities::ResourceKind;
use crate::domain::hit_worker::HitRecorder;
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;
use crate::infrastructure::cache::FastStore;

pub const PENDING_PREFIX: &str = "pending:";
pub const DEFAULT_FLUSH_THRESHOLD: i64 = 10;
const DEFAULT_FLUSH_RETRIES: usize = 3;

/// Fast store key holding un-flushed hits for one resource.
pub fn pending_key(kind: ResourceKind, code: &str) -> String {
    format!("{PENDING_PREFIX}{}:{}", kind.as_str(), code)
}

fn parse_pending_key(key: &str) -> Option<(ResourceKind, &str)> {
    let (kind, code) = key.strip_prefix(PENDING_PREFIX)?.split_once(':')?;
    if code.is_empty() {
        return None;
    }
    Some((kind.parse().ok()?, code))
}

/// Result of flushing one pending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending, or another flusher claimed the batch first.
    Empty,
    /// The delta was added to the durable counter.
    Flushed(i64),
    /// The durable write failed and the delta was put back as pending.
    Restored(i64),
    /// The delta could be neither written nor put back.
    Lost(i64),
}

/// Totals of a full pending-counter sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub scanned: u64,
    pub flushed_keys: u64,
    pub flushed_hits: i64,
    pub restored_hits: i64,
    pub lost_hits: i64,
    pub skipped_keys: u64,
}

impl SyncReport {
    fn record(&mut self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Empty => {}
            FlushOutcome::Flushed(n) => {
                self.flushed_keys += 1;
                self.flushed_hits += n;
            }
            FlushOutcome::Restored(n) => self.restored_hits += n,
            FlushOutcome::Lost(n) => self.lost_hits += n,
        }
    }
}

/// Aggregates hits in the fast store and flushes them to the durable store.
pub struct CounterAggregator {
    store: Arc<dyn FastStore>,
    repository: Arc<dyn ResourceRepository>,
    cache: Arc<ResolutionCache>,
    threshold: i64,
    flush_retries: usize,
}

impl CounterAggregator {
    pub fn new(
        store: Arc<dyn FastStore>,
        repository: Arc<dyn ResourceRepository>,
        cache: Arc<ResolutionCache>,
        threshold: i64,
    ) -> Self {
        Self {
            store,
            repository,
            cache,
            threshold: threshold.max(1),
            flush_retries: DEFAULT_FLUSH_RETRIES,
        }
    }

    /// Overrides how many times a failed durable write is retried before the
    /// delta is restored.
    pub fn with_flush_retries(mut self, retries: usize) -> Self {
        self.flush_retries = retries;
        self
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Counts one hit.
    ///
    /// Reaching the threshold flushes pending hits in whole batches of
    /// `threshold`, each claimed atomically, until fewer than `threshold`
    /// remain. After N concurrent hits, N a multiple of the threshold, the
    /// durable counter holds exactly N with nothing left pending. When the
    /// fast store is unreachable the durable counter is incremented directly.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] only when both stores fail, in which
    /// case the hit is lost.
    pub async fn record_hit(&self, kind: ResourceKind, code: &str) -> Result<(), AppError> {
        let key = pending_key(kind, code);

        match self.store.increment(&key, 1).await {
            Ok(count) if count >= self.threshold => {
                self.flush_batches(kind, code).await;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(%kind, code, error = %e, "Fast store increment failed, counting durably");
                metrics::counter!("hits_direct_total", "kind" => kind.as_str()).increment(1);

                self.repository.increment_counter(kind, code, 1).await?;
                self.cache.invalidate(kind, code).await;
                Ok(())
            }
        }
    }

    /// Claims and writes threshold-sized batches while enough hits are pending.
    ///
    /// Every caller that observed the threshold keeps claiming until a claim
    /// fails, so the last incrementer always leaves less than one batch behind.
    async fn flush_batches(&self, kind: ResourceKind, code: &str) {
        let key = pending_key(kind, code);

        loop {
            match self.store.claim(&key, self.threshold).await {
                Ok(true) => {
                    let outcome = self.write_delta(kind, code, &key, self.threshold).await;
                    if !matches!(outcome, FlushOutcome::Flushed(_)) {
                        break;
                    }
                }
                Ok(false) => break,
                Err(e) => {
                    tracing::warn!(%kind, code, error = %e, "Failed to claim pending batch");
                    break;
                }
            }
        }
    }

    /// Claims everything pending for one resource and adds it durably.
    ///
    /// Never fails: durable errors are retried with exponential backoff and
    /// then compensated by restoring the delta.
    pub async fn flush(&self, kind: ResourceKind, code: &str) -> FlushOutcome {
        let key = pending_key(kind, code);

        let delta = match self.store.take(&key).await {
            Ok(d) if d > 0 => d,
            Ok(_) => return FlushOutcome::Empty,
            Err(e) => {
                tracing::warn!(%kind, code, error = %e, "Failed to claim pending hits");
                return FlushOutcome::Empty;
            }
        };

        self.write_delta(kind, code, &key, delta).await
    }

    /// Adds a claimed delta to the durable counter, restoring it to `key` if
    /// the write keeps failing.
    async fn write_delta(&self, kind: ResourceKind, code: &str, key: &str, delta: i64) -> FlushOutcome {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(25)
            .max_delay(Duration::from_millis(500))
            .take(self.flush_retries);

        let written = Retry::spawn(strategy, || {
            self.repository.increment_counter(kind, code, delta)
        })
        .await;

        match written {
            Ok(true) => {
                tracing::debug!(%kind, code, delta, "Flushed pending hits");
                metrics::counter!("hits_flushed_total", "kind" => kind.as_str()).increment(delta as u64);
                self.cache.invalidate(kind, code).await;
                FlushOutcome::Flushed(delta)
            }
            Ok(false) => {
                tracing::warn!(%kind, code, delta, "Pending hits for unknown resource discarded");
                FlushOutcome::Lost(delta)
            }
            Err(e) => {
                tracing::error!(%kind, code, delta, error = %e, "Durable flush failed, restoring pending hits");
                metrics::counter!("flush_compensations_total", "kind" => kind.as_str()).increment(1);

                match self.store.increment(key, delta).await {
                    Ok(_) => FlushOutcome::Restored(delta),
                    Err(e) => {
                        tracing::error!(%kind, code, delta, error = %e, "Failed to restore pending hits");
                        metrics::counter!("hits_lost_total", "kind" => kind.as_str()).increment(delta as u64);
                        FlushOutcome::Lost(delta)
                    }
                }
            }
        }
    }

    /// Flushes every pending batch regardless of threshold.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if the pending keys cannot be listed.
    pub async fn force_sync_all(&self) -> Result<SyncReport, AppError> {
        let keys = self.store.keys_with_prefix(PENDING_PREFIX).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list pending counters");
            AppError::unavailable(
                "Fast store unavailable",
                json!({ "reason": e.to_string() }),
            )
        })?;

        let mut report = SyncReport {
            scanned: keys.len() as u64,
            ..SyncReport::default()
        };

        for key in &keys {
            match parse_pending_key(key) {
                Some((kind, code)) => report.record(self.flush(kind, code).await),
                None => {
                    tracing::warn!(key, "Skipping malformed pending counter key");
                    report.skipped_keys += 1;
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            flushed_keys = report.flushed_keys,
            flushed_hits = report.flushed_hits,
            restored_hits = report.restored_hits,
            lost_hits = report.lost_hits,
            "Pending counters synced"
        );

        Ok(report)
    }

    /// Un-flushed hits for one resource; 0 when absent or unreadable.
    pub async fn pending(&self, kind: ResourceKind, code: &str) -> i64 {
        match self.store.get(&pending_key(kind, code)).await {
            Ok(Some(bytes)) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::debug!(%kind, code, error = %e, "Pending counter unavailable");
                0
            }
        }
    }
}

#[async_trait]
impl HitRecorder for CounterAggregator {
    async fn record_hit(&self, kind: ResourceKind, code: &str) -> Result<(), AppError> {
        CounterAggregator::record_hit(self, kind, code).await
    }
}
