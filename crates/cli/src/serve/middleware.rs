//! Request middleware: per-IP rate limiting and API key checks.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::json_error;
use super::state::AppState;

/// Counts the request against its source IP before anything else runs.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(retry_after) = state.rate_limiter.check(addr.ip()).await {
        let body = serde_json::json!({
            "error": "rate limit exceeded",
            "retry_after": retry_after,
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    next.run(request).await
}

/// The key a request presents, from `Authorization: Bearer <key>` or the
/// `X-API-Key` header. An Authorization header with another scheme falls
/// through to `X-API-Key`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|value| value.to_str().ok()))
}

/// Rejects requests that do not carry the configured API key.
///
/// Does nothing when no key is configured. `/health` stays open either
/// way so load balancers can probe it. A request with no key at all is a
/// 401, one with a wrong key a 403.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let required = match state.api_key.as_deref() {
        Some(key) => key,
        None => return next.run(request).await,
    };
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }
    match presented_key(request.headers()) {
        Some(key) if key == required => {}
        Some(_) => {
            return json_error(StatusCode::FORBIDDEN, "invalid API key").into_response();
        }
        None => {
            return json_error(StatusCode::UNAUTHORIZED, "authentication required")
                .into_response();
        }
    }
    next.run(request).await
}
