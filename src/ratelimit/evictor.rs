//! Background eviction of idle buckets.
//!
//! Buckets are created lazily and never removed by the admission path, so a
//! recurring sweep drops any bucket whose window started at least
//! `retention_ms` ago. A request racing with the sweep simply starts a fresh
//! bucket, which is indistinguishable from a window reset.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::table::BucketTable;
use crate::clock;
use crate::error::{Result, ThrottleError};

/// Default cadence of the background sweep.
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(300);
/// Default multiple of the window after which an idle bucket is evicted.
pub const DEFAULT_RETENTION_FACTOR: u64 = 2;

/// When and what to evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Time between sweeps
    pub interval: Duration,
    /// Idle time after which a bucket is removed, in milliseconds
    pub retention_ms: u64,
}

impl EvictionPolicy {
    /// Build a policy retaining buckets for `retention_factor` windows.
    pub fn new(interval: Duration, window_ms: u64, retention_factor: u64) -> Self {
        Self {
            interval,
            retention_ms: window_ms.saturating_mul(retention_factor),
        }
    }
}

/// Sweeps idle buckets out of a [`BucketTable`].
pub struct Evictor;

impl Evictor {
    /// Remove every bucket idle for at least `retention_ms` as of `now_ms`.
    ///
    /// A bucket some request still holds is kept even if idle: that request
    /// is about to count against it, and dropping it from the table would let
    /// later requests open a second bucket for the same window.
    ///
    /// Returns the number of buckets removed.
    pub fn sweep(table: &BucketTable, now_ms: u64, retention_ms: u64) -> usize {
        let removed = table.remove_if(|_, bucket| {
            Arc::strong_count(bucket) == 1 && bucket.is_idle(now_ms, retention_ms)
        });

        debug!(removed, remaining = table.len(), "Eviction sweep complete");

        removed
    }

    /// Spawn the recurring sweep on the current tokio runtime.
    ///
    /// Fails if called outside a runtime or with a zero interval. The first
    /// sweep runs one full interval after start.
    pub fn start(table: Arc<BucketTable>, policy: EvictionPolicy) -> Result<EvictorHandle> {
        if policy.interval.is_zero() {
            return Err(ThrottleError::Evictor(
                "eviction interval must be greater than zero".to_string(),
            ));
        }

        let runtime = Handle::try_current()
            .map_err(|e| ThrottleError::Evictor(format!("no tokio runtime available: {}", e)))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run(table, policy, stop_rx));

        info!(
            interval_ms = policy.interval.as_millis() as u64,
            retention_ms = policy.retention_ms,
            "Evictor started"
        );

        Ok(EvictorHandle { stop_tx, task })
    }
}

async fn run(
    table: Arc<BucketTable>,
    policy: EvictionPolicy,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                Evictor::sweep(&table, clock::now_millis(), policy.retention_ms);
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Evictor loop exited");
}

/// Handle to a running evictor task.
pub struct EvictorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl EvictorHandle {
    /// Signal the sweep loop to stop and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        // A send error means the loop is already gone; the join below reports why.
        let _ = self.stop_tx.send(true);

        self.task
            .await
            .map_err(|e| ThrottleError::Evictor(format!("evictor task failed: {}", e)))?;

        info!("Evictor stopped");
        Ok(())
    }

    /// Whether the sweep task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{LimitConfig, RateLimiter};

    #[test]
    fn test_policy_from_factor() {
        let policy = EvictionPolicy::new(Duration::from_secs(60), 5_000, 2);
        assert_eq!(policy.retention_ms, 10_000);
    }

    #[test]
    fn test_sweep_removes_idle_buckets() {
        let table = BucketTable::new();
        table.get_or_create("idle", 0);
        table.get_or_create("edge", 1_000);
        table.get_or_create("fresh", 5_000);

        let removed = Evictor::sweep(&table, 11_000, 10_000);

        assert_eq!(removed, 2);
        assert!(table.get("idle").is_none());
        assert!(table.get("edge").is_none());
        assert!(table.get("fresh").is_some());
    }

    #[test]
    fn test_sweep_keeps_bucket_held_by_request() {
        let table = Arc::new(BucketTable::new());
        let limiter = RateLimiter::with_table(LimitConfig::default(), Arc::clone(&table));
        limiter.check_and_consume("k", 0);

        // A request has fetched the stale bucket but not yet counted itself.
        let held = table.get_or_create("k", 10_000);
        assert_eq!(Evictor::sweep(&table, 10_000, 10_000), 0);

        let mut admitted = usize::from(held.consume(10_000, 2, 5_000));
        drop(held);
        for t in [10_001, 10_002] {
            admitted += usize::from(limiter.check_and_consume("k", t).allowed);
        }

        assert_eq!(admitted, 2);
        assert_eq!(limiter.current_count("k"), Some(3));
    }

    #[test]
    fn test_sweep_empty_table() {
        let table = BucketTable::new();
        assert_eq!(Evictor::sweep(&table, 1_000_000, 10_000), 0);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let table = Arc::new(BucketTable::new());
        let policy = EvictionPolicy::new(Duration::from_secs(1), 5_000, 2);

        let result = Evictor::start(table, policy);
        assert!(matches!(result, Err(ThrottleError::Evictor(_))));
    }

    #[tokio::test]
    async fn test_start_with_zero_interval_fails() {
        let table = Arc::new(BucketTable::new());
        let policy = EvictionPolicy::new(Duration::ZERO, 5_000, 2);

        assert!(Evictor::start(table, policy).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let table = Arc::new(BucketTable::new());
        let policy = EvictionPolicy::new(Duration::from_secs(3600), 5_000, 2);

        let handle = Evictor::start(table, policy).unwrap();
        assert!(!handle.is_finished());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_recurs() {
        let table = Arc::new(BucketTable::new());
        let policy = EvictionPolicy {
            interval: Duration::from_millis(100),
            retention_ms: 0,
        };
        let handle = Evictor::start(Arc::clone(&table), policy).unwrap();

        for _ in 0..3 {
            table.get_or_create("client", 0);
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert!(table.is_empty());
        }

        handle.shutdown().await.unwrap();
    }
}
