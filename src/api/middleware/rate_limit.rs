//! Fixed-window rate limiting per client and endpoint tier.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::application::services::{Admission, RateTier};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_identity;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Limits resource creation (`CREATE_RATE_LIMIT` per window).
///
/// # Example
///
/// ```rust,ignore
/// let create = Router::new()
///     .route("/shorten", post(shorten_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::create_tier));
/// ```
pub async fn create_tier(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    admit(&st, RateTier::Create, req, next).await
}

/// Limits info and image lookups (`INFO_RATE_LIMIT` per window).
pub async fn info_tier(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    admit(&st, RateTier::Info, req, next).await
}

/// Admits or rejects a request under `tier`.
///
/// The client is identified by its peer address, or by forwarding headers
/// when `BEHIND_PROXY` is set. Rejections carry `Retry-After`; admitted
/// requests carry the remaining budget when it is known.
async fn admit(
    st: &AppState,
    tier: RateTier,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(req.headers(), peer, st.behind_proxy);

    match st.rate_limiter.admit(&identity, tier).await {
        Admission::Rejected { retry_after } => Err(AppError::rate_limited(retry_after)),
        Admission::Allowed { remaining } => {
            let mut response = next.run(req).await;
            if let Some(remaining) = remaining {
                response
                    .headers_mut()
                    .insert(REMAINING_HEADER, HeaderValue::from(remaining));
            }
            Ok(response)
        }
    }
}
