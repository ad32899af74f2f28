//! Storage abstraction for the distributed sliding-window backend.
//!
//! No distributed backend exists upstream to generalize from — the in-process
//! `SlidingLogState` keeps its log in a local `VecDeque`. A distributed
//! sliding-window counter needs a shared store, so this trait is shaped
//! after the Redis sorted-set primitives (`ZADD`/`ZREMRANGEBYSCORE`/`ZCARD`)
//! that a real distributed implementation would sit on top of, matching the
//! external interface's "sliding-window log keyed per-client, backed by a
//! shared store" description.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A minimal sorted-set store: each member has a numeric score, and members
/// can be queried/removed by score range. Scores are call timestamps in
/// nanoseconds since the epoch.
#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Adds `member` to the set at `key` with the given `score`.
    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<()>;

    /// Removes all members of `key` with a score in `[min, max]`.
    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<()>;

    /// Returns the number of members currently stored at `key`.
    async fn zcard(&self, key: &str) -> Result<u64>;

    /// Sets a time-to-live on `key`, so abandoned windows are reclaimed.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;
}

/// Returns the current time as nanoseconds since the epoch, for use as a
/// sorted-set score.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos() as i64
}

#[derive(Default)]
struct SetEntry {
    members: BTreeMap<i64, Vec<String>>,
}

/// A single-process, in-memory `SortedSetStore`.
///
/// Useful for tests and for deployments that only need the sliding-window
/// backend's per-key precision without an external store — it has the same
/// memory-growth characteristics a local `SlidingLogState` would have,
/// just addressed by key instead of being a single instance.
#[derive(Default)]
pub struct InMemorySortedSetStore {
    sets: Mutex<HashMap<String, SetEntry>>,
}

impl InMemorySortedSetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SortedSetStore for InMemorySortedSetStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<()> {
        let mut sets = self.sets.lock().expect("sorted-set store mutex poisoned");
        sets.entry(key.to_string())
            .or_default()
            .members
            .entry(score)
            .or_default()
            .push(member.to_string());
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<()> {
        let mut sets = self.sets.lock().expect("sorted-set store mutex poisoned");
        if let Some(entry) = sets.get_mut(key) {
            entry.members.retain(|score, _| *score < min || *score > max);
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let sets = self.sets.lock().expect("sorted-set store mutex poisoned");
        let count = sets
            .get(key)
            .map(|entry| entry.members.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        // The in-memory store has no background reaper; an expiry of zero
        // means "delete now", matching the distributed store's semantics
        // for a window that has already fully elapsed.
        if ttl_secs == 0 {
            let mut sets = self.sets.lock().expect("sorted-set store mutex poisoned");
            sets.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zadd_and_zcard_roundtrip() {
        let store = InMemorySortedSetStore::new();
        store.zadd("k", 1, "a").await.unwrap();
        store.zadd("k", 2, "b").await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zremrangebyscore_trims_old_entries() {
        let store = InMemorySortedSetStore::new();
        store.zadd("k", 1, "a").await.unwrap();
        store.zadd("k", 100, "b").await.unwrap();
        store.zremrangebyscore("k", 0, 50).await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expire_zero_deletes_key() {
        let store = InMemorySortedSetStore::new();
        store.zadd("k", 1, "a").await.unwrap();
        store.expire("k", 0).await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 0);
    }
}
