use super::AppState;
use super::error::ApiError;
use crate::rate_limit::{RateLimitDecision, client_key};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Apply the endpoint's quota to the calling client
///
/// Paths outside `/api` pass through untouched. Limited responses carry the
/// `X-RateLimit-*` headers whether or not the request was allowed.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(quota) = state.rate_limits.for_path(&path) else {
        return next.run(request).await;
    };

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), remote);
    let decision = state.rate_limiter.check(&client, &path, quota);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!("Rate limit exceeded for {} on {}", client, path);
        ApiError::from(decision.to_error(state.rate_limiter.now())).into_response()
    };

    set_limit_headers(response.headers_mut(), &decision);
    response
}

fn set_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_epoch_secs()));
}
