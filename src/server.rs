//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, fast store setup, hit worker spawning, and
//! the Axum server lifecycle including graceful shutdown.

use crate::application::services::{
    Clock, CounterAggregator, IdentifierGenerator, RateLimiter, ResolutionCache, ResourceService,
    ServiceSettings, SystemClock,
};
use crate::config::Config;
use crate::domain::hit_event::HitEvent;
use crate::domain::hit_worker::{HitDispatcher, OverflowTracker, run_hit_worker};
use crate::domain::repositories::ResourceRepository;
use crate::infrastructure::cache::{FastStore, MemoryStore, RedisStore};
use crate::infrastructure::persistence::PgResourceRepository;
use crate::infrastructure::title_fetcher::{HttpTitleFetcher, NoopTitleFetcher, TitleFetcher};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;

/// A fully wired application, before the hit worker is started.
pub struct Assembly {
    pub state: AppState,
    /// Receiver to hand to [`run_hit_worker`]. The only sender lives inside
    /// `state`, so the worker stops once every state clone is dropped.
    pub hit_rx: mpsc::Receiver<HitEvent>,
    /// Kept outside `state` for the final counter sync on shutdown.
    pub counters: Arc<CounterAggregator>,
    /// Hits recorded outside the worker while the queue was full.
    pub overflow: OverflowTracker,
}

/// Wires services on top of the given stores.
///
/// Shared by [`run`] and the integration tests, which pass in-memory stores.
pub fn assemble(
    config: &Config,
    repository: Arc<dyn ResourceRepository>,
    store: Arc<dyn FastStore>,
    title_fetcher: Arc<dyn TitleFetcher>,
    clock: Arc<dyn Clock>,
) -> Assembly {
    let cache = Arc::new(ResolutionCache::new(
        store.clone(),
        repository.clone(),
        config.cache_ttl(),
    ));

    let counters = Arc::new(CounterAggregator::new(
        store.clone(),
        repository.clone(),
        cache.clone(),
        config.counter_flush_threshold,
    ));

    let (hits, hit_rx) = HitDispatcher::channel(config.hit_queue_capacity, counters.clone());
    let hits = hits.with_overflow_limit(config.hit_overflow_limit);
    let overflow = hits.overflow();

    let generator = IdentifierGenerator::new(
        repository.clone(),
        config.code_length,
        config.code_max_attempts,
    );

    let resource_service = Arc::new(ResourceService::new(
        repository.clone(),
        store.clone(),
        cache,
        counters.clone(),
        generator,
        title_fetcher,
        hits,
        ServiceSettings {
            base_url: config.base_url.clone(),
            count_info_reads: config.count_info_reads,
            title_timeout: config.title_fetch_timeout(),
        },
    ));

    let rate_limiter = Arc::new(RateLimiter::new(
        store.clone(),
        clock,
        config.rate_limit_policy(),
    ));

    let mut state = AppState::new(
        resource_service,
        rate_limiter,
        repository,
        store,
        config.behind_proxy,
    );
    if let Some(token) = &config.admin_token {
        state = state.with_admin_token(token);
    }

    Assembly {
        state,
        hit_rx,
        counters,
        overflow,
    }
}

/// Connects to Redis, or falls back to the in-process store.
///
/// The in-process store keeps counters and rate limits per instance, so the
/// fallback is logged as a warning.
pub async fn connect_fast_store(config: &Config) -> Arc<dyn FastStore> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Fast store: in-process (Redis not configured)");
        return Arc::new(MemoryStore::new());
    };

    match RedisStore::connect(redis_url, config.fast_store_timeout()).await {
        Ok(redis) => {
            tracing::info!("Fast store: Redis");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using in-process store.", e);
            Arc::new(MemoryStore::new())
        }
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis fast store (or in-process fallback)
/// - Background hit worker
/// - Axum HTTP server
///
/// On shutdown the hit queue is drained and every pending counter is
/// written to the database.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let repository: Arc<dyn ResourceRepository> =
        Arc::new(PgResourceRepository::new(Arc::new(pool)));

    let store = connect_fast_store(&config).await;

    let title_fetcher: Arc<dyn TitleFetcher> = if config.title_fetch_enabled {
        Arc::new(
            HttpTitleFetcher::new(config.title_fetch_timeout())
                .context("Failed to build HTTP client for title lookup")?,
        )
    } else {
        Arc::new(NoopTitleFetcher)
    };

    let Assembly {
        state,
        hit_rx,
        counters,
        overflow,
    } = assemble(
        &config,
        repository,
        store,
        title_fetcher,
        Arc::new(SystemClock),
    );

    let worker = tokio::spawn(run_hit_worker(
        hit_rx,
        counters.clone(),
        config.hit_worker_concurrency,
    ));
    tracing::info!("Hit worker started");

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Hit worker terminated abnormally");
    }
    overflow.wait_idle().await;

    match counters.force_sync_all().await {
        Ok(report) => tracing::info!(
            flushed_keys = report.flushed_keys,
            flushed_hits = report.flushed_hits,
            restored_hits = report.restored_hits,
            "Pending counters synced on shutdown"
        ),
        Err(e) => tracing::error!(error = %e, "Final counter sync failed"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining");
}
