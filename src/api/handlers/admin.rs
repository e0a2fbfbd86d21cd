//! Handlers for the admin surface. Mounted only when `ADMIN_TOKEN` is set.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::admin::ClearCacheResponse;
use crate::application::services::SyncReport;
use crate::error::AppError;
use crate::infrastructure::cache::StoreStats;
use crate::state::AppState;

/// Flushes every pending counter to the database.
///
/// `POST /admin/sync`
pub async fn sync_counters_handler(
    State(state): State<AppState>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.resource_service.sync_all_counters().await?;
    tracing::info!(
        flushed_keys = report.flushed_keys,
        flushed_hits = report.flushed_hits,
        "Counters synced via admin API"
    );
    Ok(Json(report))
}

/// `GET /admin/cache/stats`
pub async fn cache_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.resource_service.cache_stats().await?))
}

/// Deletes fast store keys under a prefix, e.g. `DELETE /admin/cache/url:`.
///
/// # Errors
///
/// Returns 400 Bad Request for an empty prefix or one covering pending counters.
pub async fn clear_cache_handler(
    Path(prefix): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClearCacheResponse>, AppError> {
    let removed = state.resource_service.clear_cache_prefix(&prefix).await?;
    Ok(Json(ClearCacheResponse { prefix, removed }))
}
