//! Handlers for creating and inspecting resources.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::resource::{
    CreateResourceRequest, HistoryParams, HistoryResponse, ImageResponse, ResourceResponse,
};
use crate::application::services::Access;
use crate::domain::entities::{
    HistoryQuery, HistorySort, Representation, ResourceKind, SortOrder,
};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "target_url": "https://example.com/some/page" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "kind": "url",
///   "code": "Xy3kP9q",
///   "target_url": "https://example.com/some/page",
///   "title": "Some Page",
///   "hits": 0,
///   "counter_label": "clicks",
///   "short_url": "https://s.example.com/Xy3kP9q",
///   "created_at": "2026-01-15T10:30:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request for an invalid or non-HTTP(S) URL
/// - 429 Too Many Requests when the creation budget is spent
/// - 503 Service Unavailable when the database is unreachable
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), AppError> {
    create(&state, ResourceKind::ShortLink, payload).await
}

/// Creates a QR code: `POST /qrcode`. Same body and errors as [`shorten_handler`].
pub async fn create_qrcode_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), AppError> {
    create(&state, ResourceKind::QrCode, payload).await
}

/// Creates a barcode: `POST /barcode`. Same body and errors as [`shorten_handler`].
pub async fn create_barcode_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), AppError> {
    create(&state, ResourceKind::Barcode, payload).await
}

async fn create(
    state: &AppState,
    kind: ResourceKind,
    payload: CreateResourceRequest,
) -> Result<(StatusCode, Json<ResourceResponse>), AppError> {
    payload.validate()?;

    let service = &state.resource_service;
    let view = service
        .create(kind, &payload.target_url, payload.owner_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ResourceResponse::from_view(view, service.base_url())),
    ))
}

/// Returns a short link with its click count: `GET /info/{code}`.
///
/// Not counted as a click unless `COUNT_INFO_READS` is enabled.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn link_info_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    info(&state, ResourceKind::ShortLink, &code).await
}

/// `GET /qrcode/info/{id}`
pub async fn qrcode_info_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    info(&state, ResourceKind::QrCode, &code).await
}

/// `GET /barcode/info/{id}`
pub async fn barcode_info_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    info(&state, ResourceKind::Barcode, &code).await
}

async fn info(
    state: &AppState,
    kind: ResourceKind,
    code: &str,
) -> Result<Json<ResourceResponse>, AppError> {
    let service = &state.resource_service;
    let view = service.resolve_and_count(kind, code, Access::Inspect).await?;

    Ok(Json(ResourceResponse::from_view(view, service.base_url())))
}

const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Lists the short links created by one owner.
///
/// # Endpoint
///
/// `GET /urls/history?owner_id=7&page=1&limit=20&sort=clicks&order=desc`
///
/// `sort` is `created_at` (default) or `clicks` (`hits` also works); `order`
/// is `desc` (default) or `asc`. `limit` is at most 100.
///
/// # Response
///
/// ```json
/// { "page": 1, "limit": 20, "total": 42, "items": [ ... ] }
/// ```
///
/// # Errors
///
/// - 400 Bad Request for a missing owner, bad paging or an unknown sort
/// - 503 Service Unavailable when the database is unreachable
pub async fn url_history_handler(
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    history(&state, ResourceKind::ShortLink, params).await
}

/// `GET /qrcodes/history`, sorted by `created_at` or `scans`.
pub async fn qrcode_history_handler(
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    history(&state, ResourceKind::QrCode, params).await
}

/// `GET /barcodes/history`, sorted by `created_at` or `scans`.
pub async fn barcode_history_handler(
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    history(&state, ResourceKind::Barcode, params).await
}

async fn history(
    state: &AppState,
    kind: ResourceKind,
    params: HistoryParams,
) -> Result<Json<HistoryResponse>, AppError> {
    params.validate()?;

    let sort = match params.sort.as_deref() {
        None => HistorySort::default(),
        Some(value) => HistorySort::parse(value, kind).ok_or_else(|| {
            AppError::bad_request(
                "Invalid sort field",
                json!({ "field": "sort", "allowed": ["created_at", kind.counter_label()] }),
            )
        })?,
    };
    let order = match params.order.as_deref() {
        None => SortOrder::default(),
        Some(value) => SortOrder::parse(value).ok_or_else(|| {
            AppError::bad_request(
                "Invalid sort order",
                json!({ "field": "order", "allowed": ["asc", "desc"] }),
            )
        })?,
    };

    let query = HistoryQuery {
        owner_id: params.owner_id,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        sort,
        order,
    };

    let service = &state.resource_service;
    let (views, total) = service.history(kind, query).await?;

    Ok(Json(HistoryResponse {
        page: query.page,
        limit: query.limit,
        total,
        items: views
            .into_iter()
            .map(|view| ResourceResponse::from_view(view, service.base_url()))
            .collect(),
    }))
}

/// Describes the image for a QR code: `GET /qrcode/{id}/image`.
///
/// The payload is the public scan URL, so scanning the rendered image goes
/// through the counting redirect.
pub async fn qrcode_image_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ImageResponse>, AppError> {
    image(&state, ResourceKind::QrCode, &code).await
}

/// Describes the image for a barcode: `GET /barcode/{id}/image`.
pub async fn barcode_image_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ImageResponse>, AppError> {
    image(&state, ResourceKind::Barcode, &code).await
}

async fn image(
    state: &AppState,
    kind: ResourceKind,
    code: &str,
) -> Result<Json<ImageResponse>, AppError> {
    let service = &state.resource_service;
    let view = service.resolve_and_count(kind, code, Access::Inspect).await?;

    let representation = service.render(kind, &view);
    if !matches!(representation, Representation::Image { .. }) {
        return Err(AppError::internal(
            "Resource has no image representation",
            json!({ "kind": kind }),
        ));
    }

    Ok(Json(ImageResponse {
        kind,
        code: view.code,
        representation,
    }))
}
