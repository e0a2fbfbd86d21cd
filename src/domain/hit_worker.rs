//! Background hit processing.
//!
//! Handlers hand hits to a [`HitDispatcher`]; [`run_hit_worker`] drains the
//! channel and records each hit with bounded concurrency. When the channel is
//! full the hit is recorded on a background task, at most `overflow_limit` at
//! a time; beyond that it is dropped and counted.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use super::entities::ResourceKind;
use super::hit_event::HitEvent;
use crate::error::AppError;

/// Concurrent overflow recordings allowed when the queue is full.
pub const DEFAULT_OVERFLOW_LIMIT: usize = 1000;

/// Sink that counts a single hit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HitRecorder: Send + Sync {
    async fn record_hit(&self, kind: ResourceKind, code: &str) -> Result<(), AppError>;
}

/// Permits for overflow recordings. Also used to wait for them at shutdown.
#[derive(Clone)]
pub struct OverflowTracker {
    semaphore: Arc<Semaphore>,
    limit: u32,
}

impl OverflowTracker {
    fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit: limit as u32,
        }
    }

    /// Overflow recordings currently running.
    pub fn in_flight(&self) -> usize {
        self.limit as usize - self.semaphore.available_permits()
    }

    /// Waits until every running overflow recording has finished.
    pub async fn wait_idle(&self) {
        if let Ok(permits) = self.semaphore.acquire_many(self.limit).await {
            drop(permits);
        }
    }
}

/// Cloneable producer side of the hit queue.
#[derive(Clone)]
pub struct HitDispatcher {
    tx: mpsc::Sender<HitEvent>,
    recorder: Arc<dyn HitRecorder>,
    overflow: OverflowTracker,
}

impl HitDispatcher {
    /// Creates a dispatcher and the receiver to pass to [`run_hit_worker`].
    pub fn channel(
        capacity: usize,
        recorder: Arc<dyn HitRecorder>,
    ) -> (Self, mpsc::Receiver<HitEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let overflow = OverflowTracker::new(DEFAULT_OVERFLOW_LIMIT);
        (
            Self {
                tx,
                recorder,
                overflow,
            },
            rx,
        )
    }

    /// Replaces the overflow budget. Call before cloning.
    pub fn with_overflow_limit(mut self, limit: usize) -> Self {
        self.overflow = OverflowTracker::new(limit);
        self
    }

    /// Handle for waiting on overflow recordings.
    pub fn overflow(&self) -> OverflowTracker {
        self.overflow.clone()
    }

    /// Queues a hit without waiting.
    ///
    /// A full or closed queue falls back to a background recording while an
    /// overflow permit is free; otherwise the hit is dropped.
    pub fn dispatch(&self, event: HitEvent) {
        let event = match self.tx.try_send(event) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(event)) => {
                metrics::counter!("hit_queue_overflow_total").increment(1);
                event
            }
            Err(mpsc::error::TrySendError::Closed(event)) => event,
        };

        let Ok(permit) = Arc::clone(&self.overflow.semaphore).try_acquire_owned() else {
            tracing::warn!(kind = %event.kind, code = %event.code, "Hit queue and overflow budget exhausted, dropping hit");
            metrics::counter!("hits_dropped_total", "kind" => event.kind.as_str()).increment(1);
            return;
        };

        tracing::debug!(kind = %event.kind, code = %event.code, "Hit queue unavailable, recording in background");
        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = recorder.record_hit(event.kind, &event.code).await {
                tracing::error!(kind = %event.kind, code = %event.code, error = %e, "Failed to record hit");
            }
        });
    }

    /// Number of events waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Drains `rx`, recording at most `concurrency` hits at a time.
///
/// Returns once every sender is dropped and all in-flight hits finished.
pub async fn run_hit_worker(
    mut rx: mpsc::Receiver<HitEvent>,
    recorder: Arc<dyn HitRecorder>,
    concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let recorder = Arc::clone(&recorder);

        tasks.spawn(async move {
            let _permit = permit;
            if let Err(e) = recorder.record_hit(event.kind, &event.code).await {
                tracing::error!(kind = %event.kind, code = %event.code, error = %e, "Failed to record hit");
            }
        });

        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
    tracing::info!("Hit worker drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRecorder {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl HitRecorder for CountingRecorder {
        async fn record_hit(&self, _kind: ResourceKind, _code: &str) -> Result<(), AppError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue_on_close() {
        let recorder = Arc::new(CountingRecorder::default());
        let (dispatcher, rx) = HitDispatcher::channel(100, recorder.clone());
        let worker = tokio::spawn(run_hit_worker(rx, recorder.clone(), 4));

        for _ in 0..50 {
            dispatcher.dispatch(HitEvent::new(ResourceKind::ShortLink, "abc123"));
        }
        drop(dispatcher);

        worker.await.unwrap();
        assert_eq!(recorder.hits.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_full_queue_records_in_background() {
        let recorder = Arc::new(CountingRecorder::default());
        let (dispatcher, _rx) = HitDispatcher::channel(1, recorder.clone());

        dispatcher.dispatch(HitEvent::new(ResourceKind::QrCode, "a"));
        dispatcher.dispatch(HitEvent::new(ResourceKind::QrCode, "b"));
        assert_eq!(dispatcher.queue_depth(), 1);

        dispatcher.overflow().wait_idle().await;
        assert_eq!(recorder.hits.load(Ordering::SeqCst), 1);
    }

    /// Recorder that blocks until released, to hold overflow permits.
    struct GatedRecorder {
        gate: Arc<Semaphore>,
        hits: AtomicUsize,
    }

    #[async_trait]
    impl HitRecorder for GatedRecorder {
        async fn record_hit(&self, _kind: ResourceKind, _code: &str) -> Result<(), AppError> {
            let _pass = self.gate.acquire().await;
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overflow_is_bounded_and_drained() {
        let gate = Arc::new(Semaphore::new(0));
        let recorder = Arc::new(GatedRecorder {
            gate: gate.clone(),
            hits: AtomicUsize::new(0),
        });
        let (dispatcher, _rx) = HitDispatcher::channel(1, recorder.clone());
        let dispatcher = dispatcher.with_overflow_limit(3);
        let overflow = dispatcher.overflow();

        // One queued, three in overflow, the rest dropped.
        for _ in 0..10 {
            dispatcher.dispatch(HitEvent::new(ResourceKind::ShortLink, "abc123"));
        }
        assert_eq!(dispatcher.queue_depth(), 1);
        assert_eq!(overflow.in_flight(), 3);

        gate.add_permits(10);
        overflow.wait_idle().await;

        assert_eq!(overflow.in_flight(), 0);
        assert_eq!(recorder.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_closed_queue_records_in_background() {
        let recorder = Arc::new(CountingRecorder::default());
        let (dispatcher, rx) = HitDispatcher::channel(10, recorder.clone());
        drop(rx);

        dispatcher.dispatch(HitEvent::new(ResourceKind::Barcode, "x"));
        dispatcher.overflow().wait_idle().await;

        assert_eq!(recorder.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_worker_survives_recorder_errors() {
        let mut recorder = MockHitRecorder::new();
        recorder
            .expect_record_hit()
            .times(3)
            .returning(|_, _| Err(AppError::unavailable("down", serde_json::json!({}))));
        let recorder: Arc<dyn HitRecorder> = Arc::new(recorder);

        let (dispatcher, rx) = HitDispatcher::channel(10, recorder.clone());
        for _ in 0..3 {
            dispatcher.dispatch(HitEvent::new(ResourceKind::Barcode, "x"));
        }
        drop(dispatcher);

        run_hit_worker(rx, recorder, 2).await;
    }
}
