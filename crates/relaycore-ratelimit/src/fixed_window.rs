//! In-process fixed-window backend.
//!
//! Generalizes a single-instance `FixedWindowState`
//! (one shared window for the whole service) into a sharded, per-key map:
//! each key gets its own window, striped across a fixed number of shards the
//! way capacity-bounded cache eviction stores are sharded.

use crate::backend::RateLimiterBackend;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_SHARD_COUNT: usize = 16;

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: usize,
    window_start: Instant,
    last_touched: Instant,
}

/// In-process, per-key fixed-window rate limiter.
pub struct FixedWindowBackend {
    shards: Vec<Mutex<HashMap<String, WindowState>>>,
    limit: usize,
    window: Duration,
}

impl FixedWindowBackend {
    /// Creates a backend admitting up to `limit` calls per `window`, per key.
    pub fn new(limit: usize, window: Duration) -> Arc<Self> {
        Self::with_shards(limit, window, DEFAULT_SHARD_COUNT)
    }

    /// As [`FixedWindowBackend::new`], with an explicit shard count.
    pub fn with_shards(limit: usize, window: Duration, shard_count: usize) -> Arc<Self> {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect();
        Arc::new(Self {
            shards,
            limit,
            window,
        })
    }

    fn shard_for(&self, key: &str) -> &Mutex<HashMap<String, WindowState>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Evicts entries untouched for more than two windows.
    fn sweep(&self) {
        let threshold = self.window * 2;
        let now = Instant::now();
        for shard in &self.shards {
            let mut guard = shard.lock().expect("fixed-window shard mutex poisoned");
            guard.retain(|_, state| now.duration_since(state.last_touched) < threshold);
        }
    }

    /// Spawns a background sweeper, submitted through the pool manager's
    /// `background` pool when a `PoolRegistry` has been populated, falling
    /// back to a bare `tokio::spawn` otherwise — the fallback is load-bearing:
    /// if the pool subsystem was never initialized, the limiter must still
    /// start its housekeeper or entries leak.
    pub async fn spawn_sweeper(self: &Arc<Self>, sweep_interval: Duration) -> SweeperHandle {
        let backend = Arc::clone(self);
        let stop = Arc::new(tokio::sync::Notify::new());
        let stop_for_task = Arc::clone(&stop);
        let fut: BoxFuture<'static, ()> = Box::pin(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => backend.sweep(),
                    _ = stop_for_task.notified() => break,
                }
            }
        });

        match relaycore_pool::PoolRegistry::get("background") {
            Some(pool) => {
                let _ = pool.submit(fut).await;
            }
            None => {
                tokio::spawn(fut);
            }
        }
        SweeperHandle { stop }
    }
}

/// Handle to a running sweeper; dropping it does not stop the sweeper —
/// call [`SweeperHandle::stop`] explicitly (a one-shot stop sentinel).
pub struct SweeperHandle {
    stop: Arc<tokio::sync::Notify>,
}

impl SweeperHandle {
    /// Signals the sweeper loop to terminate at its next wakeup.
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

#[async_trait]
impl RateLimiterBackend for FixedWindowBackend {
    async fn allow(&self, key: &str) -> Result<bool> {
        let shard = self.shard_for(key);
        let mut guard = shard.lock().expect("fixed-window shard mutex poisoned");
        let now = Instant::now();
        let state = guard.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
            last_touched: now,
        });

        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }
        state.last_touched = now;

        if state.count < self.limit {
            state.count += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let shard = self.shard_for(key);
        let mut guard = shard.lock().expect("fixed-window shard mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}
