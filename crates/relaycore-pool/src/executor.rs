//! Abstraction over where a pool spawns its tasks.
//!
//! Generalizes a single-service executor abstraction: instead of
//! wrapping a single `tower::Service` call, a pool spawns arbitrary boxed
//! futures and never hands a `JoinHandle` back to the caller directly (the
//! caller gets a [`crate::PoolTask`] backed by a `oneshot` channel instead,
//! so panics are recoverable at the pool layer rather than visible as a
//! `JoinError`).

use futures::future::BoxFuture;

/// Spawns detached futures onto some runtime.
///
/// The default implementation uses [`tokio::runtime::Handle`]; callers
/// embedding the pool manager in a custom runtime can supply their own.
pub trait Executor: Send + Sync + 'static {
    /// Spawns `future`, running it to completion independently of the caller.
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

impl Executor for tokio::runtime::Handle {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        tokio::runtime::Handle::spawn(self, future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn handle_executor_runs_future() {
        let handle = tokio::runtime::Handle::current();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        Executor::spawn(
            &handle,
            Box::pin(async move {
                ran_clone.store(true, Ordering::SeqCst);
            }),
        );
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
