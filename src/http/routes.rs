//! Route table.

use std::sync::Arc;

use axum::{http::StatusCode, middleware, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use super::middleware::rate_limit;
use crate::ratelimit::RateLimiterBackend;

/// Demo endpoint guarded by the rate limit.
pub const DEMO_PATH: &str = "/api/v1/test/rate-limit";
/// Liveness probe.
pub const HEALTH_PATH: &str = "/health";

/// Build the application router with the rate limit applied to every route.
pub fn router(backend: Arc<dyn RateLimiterBackend>) -> Router {
    Router::new()
        .route(DEMO_PATH, get(rate_limit_demo))
        .route(HEALTH_PATH, get(health))
        .layer(middleware::from_fn_with_state(backend, rate_limit))
}

async fn rate_limit_demo() -> StatusCode {
    StatusCode::OK
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
