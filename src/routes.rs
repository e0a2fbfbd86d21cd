//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{code}`, `/qrcode/{id}`, `/barcode/{id}` - Redirects and scans (unlimited)
//! - `POST /shorten`, `/qrcode`, `/barcode`          - Creation (create tier)
//! - `GET  /info/*`, `/*/info/{id}`, `/*/{id}/image`  - Lookups (info tier)
//! - `GET  /health`                                   - Database, fast store, hit queue
//! - `/admin/*`                                       - Bearer `ADMIN_TOKEN`, only when configured
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Fixed window per client and tier
//! - **Authentication** - Bearer token (admin)
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::health_handler;
use crate::api::middleware::{auth, rate_limit, tracing};
use crate::api::routes;
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}

/// The router without path normalization.
///
/// Client identity for rate limiting follows `state.behind_proxy`; the
/// admin group is mounted only when an admin token is configured.
pub fn build_router(state: AppState) -> Router {
    let create = routes::create_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::create_tier,
    ));

    let info = routes::info_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::info_tier,
    ));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(create)
        .merge(info)
        .merge(routes::traverse_routes());

    if state.admin_enabled() {
        let admin = routes::admin_routes()
            .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));
        router = router.nest("/admin", admin);
    }

    router.with_state(state).layer(tracing::layer())
}
