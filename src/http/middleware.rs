//! Admission middleware applied in front of every route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::ratelimit::RateLimiterBackend;

/// Key used when the peer address is not available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identify the client behind a request by its remote IP address.
pub fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Run the downstream handler only if the client is within its limit.
///
/// Denied requests get `429 Too Many Requests` with a `Retry-After` header.
pub async fn rate_limit(
    State(backend): State<Arc<dyn RateLimiterBackend>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    let decision = backend.check_client(&key).await;

    if decision.allowed {
        debug!(client = %key, path = %request.uri().path(), "Request admitted");
        return next.run(request).await;
    }

    let retry_after = decision.retry_after_secs.unwrap_or_default();
    warn!(
        client = %key,
        path = %request.uri().path(),
        retry_after_secs = retry_after,
        "Request rejected by rate limit"
    );

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after.to_string())],
        "Too many requests",
    )
        .into_response()
}
