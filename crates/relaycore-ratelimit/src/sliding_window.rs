//! Distributed sliding-window backend.
//!
//! Built purely against [`SortedSetStore`], so any conforming store (Redis,
//! an in-memory stand-in, or something else entirely) can back it. Each
//! `allow(key)` call trims entries older than the window, counts what
//! remains, and — if under the limit — records the current call before
//! admitting it, the same trim-count-record sequence a Redis `ZSET`-backed
//! limiter would use.

use crate::backend::RateLimiterBackend;
use crate::error::Result;
use crate::sorted_set::{now_nanos, SortedSetStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A per-key sliding-window backend over a shared [`SortedSetStore`].
pub struct SlidingWindowBackend<S: SortedSetStore> {
    store: Arc<S>,
    limit: u64,
    window: Duration,
    sequence: AtomicU64,
}

impl<S: SortedSetStore> SlidingWindowBackend<S> {
    /// Creates a backend admitting up to `limit` calls per `window`, per key,
    /// against `store`.
    pub fn new(store: Arc<S>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
            sequence: AtomicU64::new(0),
        }
    }

    fn member_for(&self, now: i64) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{now}-{seq}")
    }
}

#[async_trait]
impl<S: SortedSetStore> RateLimiterBackend for SlidingWindowBackend<S> {
    async fn allow(&self, key: &str) -> Result<bool> {
        let now = now_nanos();
        let window_nanos = self.window.as_nanos() as i64;
        let floor = now.saturating_sub(window_nanos);

        self.store.zremrangebyscore(key, i64::MIN, floor).await?;
        let count = self.store.zcard(key).await?;

        if count >= self.limit {
            return Ok(false);
        }

        let member = self.member_for(now);
        self.store.zadd(key, now, &member).await?;
        // Doubled so a key with no recent traffic still outlives one full
        // window before the store reclaims it — a TTL of exactly one window
        // would let the key expire mid-window and silently reset the count.
        self.store
            .expire(key, (self.window * 2).as_secs().max(1))
            .await?;
        Ok(true)
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.store.zremrangebyscore(key, i64::MIN, i64::MAX).await
    }
}
