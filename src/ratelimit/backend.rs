//! Rate limiter trait consumed by the HTTP layer.

use async_trait::async_trait;

use super::limiter::Decision;

/// Trait for rate limiter implementations.
///
/// The HTTP middleware only needs an admission decision for a client key,
/// so it works against this trait rather than a concrete limiter.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Count one request from `key` and decide whether to admit it.
    async fn check_client(&self, key: &str) -> Decision;
}
