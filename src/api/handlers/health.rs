//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Database and hit queue healthy
/// - **503 Service Unavailable**: Database unreachable or hit queue closed
///
/// The fast store is reported but does not degrade the service: every
/// component that uses it falls back when it is down.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "fast_store": { "status": "ok", "message": "Reachable" },
///     "hit_queue": { "status": "ok", "message": "Queued: 0 / 10000" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let fast_store = check_fast_store(&state).await;
    let hit_queue = check_hit_queue(&state);

    let healthy = database.is_ok() && hit_queue.is_ok();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            fast_store,
            hit_queue,
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.repository.ping().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

async fn check_fast_store(state: &AppState) -> CheckStatus {
    if state.store.health_check().await {
        CheckStatus::ok("Reachable")
    } else {
        CheckStatus::error("Unreachable, serving from database")
    }
}

fn check_hit_queue(state: &AppState) -> CheckStatus {
    let hits = state.resource_service.hits();
    if hits.is_closed() {
        CheckStatus::error("Hit queue is closed")
    } else {
        CheckStatus::ok(format!(
            "Queued: {} / {}",
            hits.queue_depth(),
            hits.queue_capacity()
        ))
    }
}
