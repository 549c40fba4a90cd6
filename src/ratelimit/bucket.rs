//! Per-key request bucket.

use parking_lot::Mutex;

/// A point-in-time copy of a bucket's window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketState {
    /// When the current window started (ms since epoch)
    pub window_start: u64,
    /// Requests counted in the current window
    pub count: u64,
}

/// Fixed-window state for a single client key.
///
/// Each bucket carries its own lock, so requests for different keys never
/// contend with each other.
#[derive(Debug)]
pub struct Bucket {
    state: Mutex<BucketState>,
}

impl Bucket {
    /// Create a new bucket whose window starts at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                window_start: now_ms,
                count: 0,
            }),
        }
    }

    /// Count one request and report whether it fits within `limit`.
    ///
    /// The reset check, the increment and the comparison all happen under
    /// the bucket's lock. A window is reset only once `now - window_start`
    /// strictly exceeds `window_ms`.
    pub(crate) fn consume(&self, now_ms: u64, limit: u64, window_ms: u64) -> bool {
        let mut state = self.state.lock();

        if now_ms.saturating_sub(state.window_start) > window_ms {
            state.window_start = now_ms;
            state.count = 0;
        }

        state.count = state.count.saturating_add(1);
        state.count <= limit
    }

    /// Get the start of the current window.
    pub fn window_start(&self) -> u64 {
        self.state.lock().window_start
    }

    /// Get the number of requests counted in the current window.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> BucketState {
        *self.state.lock()
    }

    /// Whether the bucket has gone untouched for at least `retention_ms`.
    pub fn is_idle(&self, now_ms: u64, retention_ms: u64) -> bool {
        now_ms.saturating_sub(self.window_start()) >= retention_ms
    }
}
