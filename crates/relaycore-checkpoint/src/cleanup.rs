//! Auto-cleanup wrapper: periodically purges stale threads from any backend.
//!
//! Generalizes the fixed-window rate limiter's sweeper
//! (`relaycore_ratelimit::fixed_window::FixedWindowBackend::spawn_sweeper`):
//! a background task, submitted through the pool manager's `background`
//! pool when a registry has been populated and falling back to a bare
//! `tokio::spawn` otherwise, so the housekeeper always starts even if the
//! pool subsystem was never initialized.

use crate::backend::CheckpointBackend;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

/// Wraps a [`CheckpointBackend`] with a background sweep that deletes any
/// thread whose `updated_at` is older than `max_age`.
pub struct AutoCleanupCheckpointer<S, B> {
    inner: Arc<B>,
    max_age: Duration,
    _state: PhantomData<fn() -> S>,
}

impl<S, B> AutoCleanupCheckpointer<S, B>
where
    S: Send + Sync + 'static,
    B: CheckpointBackend<S> + 'static,
{
    /// Wraps `inner`, purging threads untouched for longer than `max_age`.
    pub fn new(inner: Arc<B>, max_age: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            max_age,
            _state: PhantomData,
        })
    }

    /// The wrapped backend, for callers that want direct access alongside
    /// the auto-cleanup wrapper (e.g. to build [`crate::distributed::DistributedCheckpointer`]).
    pub fn inner(&self) -> &Arc<B> {
        &self.inner
    }

    async fn sweep_once(&self) {
        let ctx = CancellationToken::new();
        let Ok(entries) = self.inner.list(&ctx).await else {
            return;
        };
        let now = SystemTime::now();
        for info in entries {
            let age = now
                .duration_since(info.updated_at)
                .unwrap_or(Duration::ZERO);
            if age > self.max_age {
                let _ = self.inner.delete(&ctx, &info.thread_id).await;
            }
        }
    }

    /// Spawns the background sweeper, submitted through the pool manager's
    /// `background` pool when available, falling back to a bare
    /// `tokio::spawn` otherwise.
    pub async fn spawn_sweeper(self: &Arc<Self>, sweep_interval: Duration) -> SweeperHandle {
        let this = Arc::clone(self);
        let stop = Arc::new(tokio::sync::Notify::new());
        let stop_for_task = Arc::clone(&stop);
        let fut: BoxFuture<'static, ()> = Box::pin(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => this.sweep_once().await,
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

#[async_trait]
impl<S, B> CheckpointBackend<S> for AutoCleanupCheckpointer<S, B>
where
    S: Send + Sync + 'static,
    B: CheckpointBackend<S> + 'static,
{
    async fn save(&self, ctx: &CancellationToken, thread_id: &str, state: S) -> crate::error::Result<()> {
        self.inner.save(ctx, thread_id, state).await
    }

    async fn load(&self, ctx: &CancellationToken, thread_id: &str) -> crate::error::Result<S> {
        self.inner.load(ctx, thread_id).await
    }

    async fn list(&self, ctx: &CancellationToken) -> crate::error::Result<Vec<crate::backend::CheckpointInfo>> {
        self.inner.list(ctx).await
    }

    async fn delete(&self, ctx: &CancellationToken, thread_id: &str) -> crate::error::Result<()> {
        self.inner.delete(ctx, thread_id).await
    }

    async fn exists(&self, ctx: &CancellationToken, thread_id: &str) -> crate::error::Result<bool> {
        self.inner.exists(ctx, thread_id).await
    }

    async fn ping(&self, ctx: &CancellationToken) -> crate::error::Result<()> {
        self.inner.ping(ctx).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCheckpointer;

    #[tokio::test]
    async fn purges_threads_older_than_max_age() {
        let store = InMemoryCheckpointer::<i32>::new();
        let ctx = CancellationToken::new();
        store.save(&ctx, "stale", 1).await.unwrap();

        let wrapped = AutoCleanupCheckpointer::new(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.save(&ctx, "fresh", 2).await.unwrap();

        let handle = wrapped.spawn_sweeper(Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop();

        assert!(!store.exists(&ctx, "stale").await.unwrap());
        assert!(store.exists(&ctx, "fresh").await.unwrap());
    }
}
