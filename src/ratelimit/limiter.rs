//! Core rate limiter implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::backend::RateLimiterBackend;
use super::table::BucketTable;
use crate::clock;

/// Default number of requests admitted per window.
pub const DEFAULT_LIMIT: u64 = 2;
/// Default window length in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 5_000;

/// Configuration for a rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Maximum requests admitted in one window
    pub limit: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl LimitConfig {
    /// Retry hint handed back on denial, in whole seconds.
    pub fn retry_after_secs(&self) -> u64 {
        self.window_ms / 1000
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Seconds the client should wait before retrying, set only on denial
    pub retry_after_secs: Option<u64>,
}

impl Decision {
    /// An admitting decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: None,
        }
    }

    /// A denying decision carrying a retry hint.
    pub fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs: Some(retry_after_secs),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Fixed-window rate limiter keyed by client identity.
///
/// This struct is thread-safe and can be shared across multiple tasks. The
/// bucket table is held behind an `Arc` so the evictor can sweep it.
pub struct RateLimiter {
    /// Admission limits, fixed at construction
    config: LimitConfig,
    /// Buckets indexed by client key
    table: Arc<BucketTable>,
}

impl RateLimiter {
    /// Create a new rate limiter with its own bucket table.
    pub fn new(config: LimitConfig) -> Self {
        Self::with_table(config, Arc::new(BucketTable::new()))
    }

    /// Create a rate limiter over an existing bucket table.
    pub fn with_table(config: LimitConfig, table: Arc<BucketTable>) -> Self {
        Self { config, table }
    }

    /// Count a request from `key` at `now_ms` and decide whether to admit it.
    ///
    /// Always produces a decision; denial is a normal outcome.
    pub fn check_and_consume(&self, key: &str, now_ms: u64) -> Decision {
        let bucket = self.table.get_or_create(key, now_ms);
        let allowed = bucket.consume(now_ms, self.config.limit, self.config.window_ms);

        trace!(key = %key, now_ms, allowed, "Checked rate limit");

        if allowed {
            Decision::allow()
        } else {
            debug!(key = %key, limit = self.config.limit, "Rate limit exceeded");
            Decision::deny(self.config.retry_after_secs())
        }
    }

    /// Same as [`check_and_consume`](Self::check_and_consume), using the wall clock.
    pub fn check(&self, key: &str) -> Decision {
        self.check_and_consume(key, clock::now_millis())
    }

    /// Get the limit configuration.
    pub fn config(&self) -> LimitConfig {
        self.config
    }

    /// Get the shared bucket table.
    pub fn table(&self) -> &Arc<BucketTable> {
        &self.table
    }

    /// Get the request count in the current window for `key`.
    ///
    /// Returns `None` if no bucket exists for the key.
    pub fn current_count(&self, key: &str) -> Option<u64> {
        self.table.get(key).map(|b| b.count())
    }

    /// Get the number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}

#[async_trait]
impl RateLimiterBackend for RateLimiter {
    async fn check_client(&self, key: &str) -> Decision {
        self.check(key)
    }
}
