//! API route groups, one per rate-limit tier plus the admin surface.
//!
//! Each group is layered in [`crate::routes::app_router`].

use crate::api::handlers::{
    barcode_history_handler, barcode_image_handler, barcode_info_handler, barcode_scan_handler,
    cache_stats_handler, clear_cache_handler, create_barcode_handler, create_qrcode_handler,
    link_info_handler, qrcode_history_handler, qrcode_image_handler, qrcode_info_handler,
    qrcode_scan_handler, redirect_handler, shorten_handler, sync_counters_handler,
    url_history_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Resource creation.
///
/// - `POST /shorten` - Create a short link
/// - `POST /qrcode`  - Create a QR code
/// - `POST /barcode` - Create a barcode
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/qrcode", post(create_qrcode_handler))
        .route("/barcode", post(create_barcode_handler))
}

/// Lookups that return data instead of redirecting.
///
/// - `GET /info/{code}`          - Short link details
/// - `GET /qrcode/info/{id}`     - QR code details
/// - `GET /barcode/info/{id}`    - Barcode details
/// - `GET /qrcode/{id}/image`    - QR code image description
/// - `GET /barcode/{id}/image`   - Barcode image description
/// - `GET /urls/history`         - An owner's short links
/// - `GET /qrcodes/history`      - An owner's QR codes
/// - `GET /barcodes/history`     - An owner's barcodes
pub fn info_routes() -> Router<AppState> {
    Router::new()
        .route("/info/{code}", get(link_info_handler))
        .route("/qrcode/info/{id}", get(qrcode_info_handler))
        .route("/barcode/info/{id}", get(barcode_info_handler))
        .route("/qrcode/{id}/image", get(qrcode_image_handler))
        .route("/barcode/{id}/image", get(barcode_image_handler))
        .route("/urls/history", get(url_history_handler))
        .route("/qrcodes/history", get(qrcode_history_handler))
        .route("/barcodes/history", get(barcode_history_handler))
}

/// Redirects and scans. Never rate limited.
///
/// - `GET /{code}`        - Short link redirect
/// - `GET /qrcode/{id}`   - QR code scan
/// - `GET /barcode/{id}`  - Barcode scan
pub fn traverse_routes() -> Router<AppState> {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/qrcode/{id}", get(qrcode_scan_handler))
        .route("/barcode/{id}", get(barcode_scan_handler))
}

/// Admin surface, nested under `/admin`.
///
/// - `POST   /sync`              - Flush all pending counters
/// - `GET    /cache/stats`       - Fast store statistics
/// - `DELETE /cache/{prefix}`    - Remove cached entries under a prefix
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_counters_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/{prefix}", delete(clear_cache_handler))
}
