#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use codeshort::application::services::{CounterAggregator, ManualClock};
use codeshort::config::Config;
use codeshort::domain::hit_event::HitEvent;
use codeshort::infrastructure::cache::{
    FastStore, MemoryStore, StoreError, StoreResult, StoreStats,
};
use codeshort::infrastructure::persistence::InMemoryResourceRepository;
use codeshort::infrastructure::title_fetcher::NoopTitleFetcher;
use codeshort::routes::build_router;
use codeshort::server::{Assembly, assemble};
use codeshort::state::AppState;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

/// Configuration with small limits; no external services are contacted.
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/codeshort_test".to_string(),
        redis_url: None,
        listen_addr: "127.0.0.1:0".to_string(),
        base_url: "https://s.example.com/".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        cache_ttl_seconds: 3600,
        fast_store_timeout_ms: 250,
        counter_flush_threshold: 10,
        hit_queue_capacity: 1000,
        hit_worker_concurrency: 4,
        hit_overflow_limit: 100,
        count_info_reads: false,
        code_length: 7,
        code_max_attempts: 8,
        create_rate_limit: 10,
        info_rate_limit: 60,
        rate_limit_window_seconds: 60,
        behind_proxy: true,
        title_fetch_enabled: false,
        title_fetch_timeout_seconds: 5,
        admin_token: Some(ADMIN_TOKEN.to_string()),
        db_max_connections: 1,
        db_connect_timeout: 1,
        db_idle_timeout: 60,
        db_max_lifetime: 60,
    }
}

/// A fast store that fails every operation, as when Redis is down.
#[derive(Default)]
pub struct UnavailableStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Connection("connection refused".to_string()))
}

#[async_trait]
impl FastStore for UnavailableStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        down()
    }
    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> StoreResult<()> {
        down()
    }
    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        down()
    }
    async fn increment(&self, _key: &str, _by: i64) -> StoreResult<i64> {
        down()
    }
    async fn increment_with_expiry(&self, _key: &str, _ttl: Duration) -> StoreResult<i64> {
        down()
    }
    async fn take(&self, _key: &str) -> StoreResult<i64> {
        down()
    }
    async fn claim(&self, _key: &str, _amount: i64) -> StoreResult<bool> {
        down()
    }
    async fn keys_with_prefix(&self, _prefix: &str) -> StoreResult<Vec<String>> {
        down()
    }
    async fn delete_prefix(&self, _prefix: &str) -> StoreResult<u64> {
        down()
    }
    async fn stats(&self) -> StoreResult<StoreStats> {
        down()
    }
    async fn health_check(&self) -> bool {
        false
    }
}

/// Application wired on in-memory stores with a manual clock.
///
/// Hits are not processed in the background: call [`TestApp::process_hits`]
/// to hand queued hits to the counter aggregator.
pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryResourceRepository>,
    pub store: Arc<dyn FastStore>,
    pub counters: Arc<CounterAggregator>,
    pub clock: ManualClock,
    hit_rx: mpsc::Receiver<HitEvent>,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn FastStore>) -> Self {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());

        let Assembly {
            state,
            hit_rx,
            counters,
            ..
        } = assemble(
            &config,
            repo.clone(),
            store.clone(),
            Arc::new(NoopTitleFetcher),
            Arc::new(clock.clone()),
        );

        Self {
            state,
            repo,
            store,
            counters,
            clock,
            hit_rx,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(build_router(self.state.clone())).unwrap()
    }

    /// Records every queued hit. Returns how many were processed.
    pub async fn process_hits(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.hit_rx.try_recv() {
            self.counters
                .record_hit(event.kind, &event.code)
                .await
                .unwrap();
            processed += 1;
        }
        processed
    }
}
