//! Handlers that traverse a resource: short link redirects and code scans.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::application::services::Access;
use crate::domain::entities::ResourceKind;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Resolve through the fast store, falling back to the database
/// 2. Queue a hit for the background worker
/// 3. Return 307 Temporary Redirect
///
/// The redirect never waits for counting and is not rate limited.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    traverse(&state, ResourceKind::ShortLink, &code).await
}

/// Scan endpoint encoded in every QR code: `GET /qrcode/{id}`.
pub async fn qrcode_scan_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    traverse(&state, ResourceKind::QrCode, &code).await
}

/// Scan endpoint encoded in every barcode: `GET /barcode/{id}`.
pub async fn barcode_scan_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    traverse(&state, ResourceKind::Barcode, &code).await
}

async fn traverse(state: &AppState, kind: ResourceKind, code: &str) -> Result<Redirect, AppError> {
    let view = state
        .resource_service
        .resolve_and_count(kind, code, Access::Traverse)
        .await?;

    Ok(Redirect::temporary(&view.target_url))
}
