//! Concurrent mapping from client key to bucket.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::bucket::Bucket;

/// Sharded table of per-key buckets.
///
/// Lookups, inserts and removals on different keys proceed on independent
/// shards. Buckets are handed out as `Arc`s so a caller can keep working on
/// a bucket after releasing the shard lock.
#[derive(Debug, Default)]
pub struct BucketTable {
    buckets: DashMap<String, Arc<Bucket>>,
}

impl BucketTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the bucket for `key`, creating one that starts at `now_ms` if absent.
    ///
    /// Insert-if-absent is atomic: concurrent first requests for the same key
    /// all receive the same bucket.
    pub fn get_or_create(&self, key: &str, now_ms: u64) -> Arc<Bucket> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(bucket.value());
        }

        let entry = self.buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(key = %key, window_start = now_ms, "Creating new bucket");
            Arc::new(Bucket::new(now_ms))
        });
        Arc::clone(entry.value())
    }

    /// Look up the bucket for `key` without creating one.
    pub fn get(&self, key: &str) -> Option<Arc<Bucket>> {
        self.buckets.get(key).map(|b| Arc::clone(b.value()))
    }

    /// Remove the bucket for `key`. Returns `true` if one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.buckets.remove(key).is_some()
    }

    /// Remove every bucket matching `predicate`, returning how many were removed.
    ///
    /// The predicate runs under the shard's write lock, so no new handle to
    /// a bucket can be taken while it is being judged.
    pub fn remove_if<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &Arc<Bucket>) -> bool,
    {
        let mut removed = 0;
        self.buckets.retain(|key, bucket| {
            if predicate(key.as_str(), bucket) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Visit every bucket in the table, in no particular order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Bucket),
    {
        for entry in self.buckets.iter() {
            f(entry.key().as_str(), entry.value().as_ref());
        }
    }

    /// Get the number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the table holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Remove all buckets.
    pub fn clear(&self) {
        self.buckets.clear();
    }
}
