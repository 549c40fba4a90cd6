//! Rate limiting logic and state management.

mod backend;
mod bucket;
mod evictor;
mod limiter;
mod table;

pub use backend::RateLimiterBackend;
pub use bucket::{Bucket, BucketState};
pub use evictor::{
    EvictionPolicy, Evictor, EvictorHandle, DEFAULT_EVICTION_INTERVAL, DEFAULT_RETENTION_FACTOR,
};
pub use limiter::{Decision, LimitConfig, RateLimiter, DEFAULT_LIMIT, DEFAULT_WINDOW_MS};
pub use table::BucketTable;
