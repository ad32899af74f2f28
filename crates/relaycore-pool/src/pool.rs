//! The pool itself: a named, semaphore-gated task spawner.

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::events::PoolEvent;
use crate::stats::{PoolStats, PoolStatsSnapshot};
use futures::future::FutureExt;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_pool_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!("pool_tasks_submitted_total", "Total tasks accepted for admission");
        describe_counter!("pool_tasks_rejected_total", "Total tasks rejected at admission");
        describe_counter!("pool_tasks_completed_total", "Total tasks that ran to completion");
        describe_counter!("pool_tasks_panicked_total", "Total tasks recovered from a panic");
        describe_gauge!("pool_tasks_running", "Tasks currently executing");
        describe_histogram!("pool_submission_wait_seconds", "Time a task spent waiting for a permit");
    });
}

/// The outcome of a task submitted to a [`Pool`].
#[derive(Debug)]
pub enum PoolOutcome<T> {
    /// The task ran to completion without panicking.
    Completed(T),
    /// The task panicked; the pool recovered and counted it as failed.
    Panicked,
    /// The task was cancelled before it began running (context cancelled
    /// while queued, or while the submitter was parked).
    Cancelled,
}

impl<T> PoolOutcome<T> {
    /// Returns the completed value, if any.
    pub fn into_completed(self) -> Option<T> {
        match self {
            PoolOutcome::Completed(v) => Some(v),
            _ => None,
        }
    }
}

/// A handle to a task's eventual outcome.
///
/// Dropping this without awaiting it does not cancel the task: the pool's
/// contract is fire-and-forget unless the caller threaded in a
/// [`CancellationToken`] via [`Pool::submit_with_context`].
pub struct PoolTask<T> {
    rx: oneshot::Receiver<PoolOutcome<T>>,
}

impl<T> Future for PoolTask<T> {
    type Output = PoolOutcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(PoolOutcome::Panicked),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A named pool of capacity-bounded, panic-isolated async task slots.
///
/// Always held behind an `Arc`; every submission method takes `self:
/// &Arc<Self>` so that spawned tasks can hold their own strong reference
/// back to the pool for stats and event updates without borrowing it.
pub struct Pool {
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    capacity: AtomicUsize,
    closed: AtomicBool,
    stats: Arc<PoolStats>,
}

impl Pool {
    /// Builds a pool from a validated [`PoolConfig`].
    pub fn new(config: PoolConfig) -> Arc<Self> {
        #[cfg(feature = "metrics")]
        describe_pool_metrics();
        let semaphore = Arc::new(Semaphore::new(config.capacity));
        Arc::new(Self {
            capacity: AtomicUsize::new(config.capacity),
            semaphore,
            closed: AtomicBool::new(false),
            stats: Arc::new(PoolStats::new()),
            config,
        })
    }

    /// The pool's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Current configured capacity (after any [`Pool::tune`] calls).
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Tasks currently executing.
    pub fn running(&self) -> usize {
        self.stats.running()
    }

    /// Permits currently free.
    pub fn free(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Tasks queued (nonblocking pools) or submitters parked (blocking pools).
    pub fn waiting(&self) -> usize {
        self.stats.waiting()
    }

    /// `true` once [`Pool::release`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// A lock-free snapshot of this pool's counters.
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Submits `task` with no cancellation token (equivalent to a token that
    /// is never cancelled).
    pub async fn submit<F, T>(self: &Arc<Self>, task: F) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit_with_context(&CancellationToken::new(), task)
            .await
    }

    /// Submits `task` bounded by `timeout`: equivalent to
    /// [`Pool::submit_with_context`] with a token derived from the deadline.
    pub async fn submit_with_timeout<F, T>(
        self: &Arc<Self>,
        timeout: Duration,
        task: F,
    ) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = CancellationToken::new();
        let deadline_ctx = ctx.clone();
        tokio::select! {
            biased;
            result = self.submit_with_context(&ctx, task) => result,
            _ = tokio::time::sleep(timeout) => {
                deadline_ctx.cancel();
                Err(PoolError::Timeout)
            }
        }
    }

    /// Submits `task`, honoring `ctx`.
    ///
    /// Checked first at enqueue time (a pre-cancelled token never enqueues),
    /// and again at execution entry (a token cancelled while queued or
    /// parked causes the task to return silently without running).
    pub async fn submit_with_context<F, T>(
        self: &Arc<Self>,
        ctx: &CancellationToken,
        task: F,
    ) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_cancelled() {
            return Err(PoolError::CancellationError);
        }
        if self.is_closed() {
            self.stats.record_submitted();
            self.stats.record_rejected();
            #[cfg(feature = "metrics")]
            metrics::counter!("pool_tasks_rejected_total", "pool" => self.config.name.clone()).increment(1);
            self.emit(PoolEvent::TaskRejected {
                pool_name: self.config.name.clone(),
                timestamp: Instant::now(),
                capacity: self.capacity(),
            });
            return Err(PoolError::Closed {
                pool: self.config.name.clone(),
            });
        }

        self.stats.record_submitted();
        #[cfg(feature = "metrics")]
        metrics::counter!("pool_tasks_submitted_total", "pool" => self.config.name.clone()).increment(1);

        if self.config.blocking {
            self.submit_blocking(ctx.clone(), task).await
        } else {
            self.submit_nonblocking(ctx.clone(), task)
        }
    }

    async fn submit_blocking<F, T>(
        self: &Arc<Self>,
        ctx: CancellationToken,
        task: F,
    ) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(max_waiting) = self.config.max_waiting {
            if self.stats.waiting() >= max_waiting {
                self.reject_overloaded();
                return Err(PoolError::Overload {
                    pool: self.config.name.clone(),
                    concurrent: self.running(),
                    capacity: self.capacity(),
                });
            }
        }

        self.stats.inc_waiting();
        let wait_start = Instant::now();
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        tokio::pin!(acquire);

        let permit = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                self.stats.dec_waiting();
                self.reject_overloaded();
                return Err(PoolError::CancellationError);
            }
            res = &mut acquire => {
                self.stats.dec_waiting();
                res.map_err(|_| PoolError::Closed { pool: self.config.name.clone() })?
            }
        };

        let wait = wait_start.elapsed();
        Ok(self.spawn_task(permit, wait, ctx, task))
    }

    fn submit_nonblocking<F, T>(self: &Arc<Self>, ctx: CancellationToken, task: F) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.spawn_task(permit, Duration::ZERO, ctx, task)),
            Err(_) => {
                if let Some(max_waiting) = self.config.max_waiting {
                    if self.stats.waiting() >= max_waiting {
                        self.reject_overloaded();
                        return Err(PoolError::Overload {
                            pool: self.config.name.clone(),
                            concurrent: self.running(),
                            capacity: self.capacity(),
                        });
                    }
                }
                Ok(self.spawn_queued(ctx, task))
            }
        }
    }

    /// Queues a task that will acquire its permit asynchronously, so the
    /// nonblocking submitter is never parked.
    fn spawn_queued<F, T>(self: &Arc<Self>, ctx: CancellationToken, task: F) -> PoolTask<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.stats.inc_waiting();
        let (tx, rx) = oneshot::channel();
        let pool = Arc::clone(self);
        let semaphore = Arc::clone(&self.semaphore);
        let fut = async move {
            let wait_start = Instant::now();
            let acquire = semaphore.acquire_owned();
            tokio::pin!(acquire);
            let permit = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    pool.stats.dec_waiting();
                    pool.stats.record_rejected();
                    let _ = tx.send(PoolOutcome::Cancelled);
                    return;
                }
                res = &mut acquire => {
                    pool.stats.dec_waiting();
                    match res {
                        Ok(p) => p,
                        Err(_) => {
                            pool.stats.record_rejected();
                            let _ = tx.send(PoolOutcome::Cancelled);
                            return;
                        }
                    }
                }
            };
            let wait = wait_start.elapsed();
            pool.run_task(permit, wait, ctx, task, tx).await;
        };
        self.config.executor.spawn(Box::pin(fut));
        PoolTask { rx }
    }

    fn spawn_task<F, T>(
        self: &Arc<Self>,
        permit: tokio::sync::OwnedSemaphorePermit,
        wait: Duration,
        ctx: CancellationToken,
        task: F,
    ) -> PoolTask<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let pool = Arc::clone(self);
        let fut = async move { pool.run_task(permit, wait, ctx, task, tx).await };
        self.config.executor.spawn(Box::pin(fut));
        PoolTask { rx }
    }

    async fn run_task<F, T>(
        self: Arc<Self>,
        permit: tokio::sync::OwnedSemaphorePermit,
        wait: Duration,
        ctx: CancellationToken,
        task: F,
        tx: oneshot::Sender<PoolOutcome<T>>,
    ) where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_cancelled() {
            self.stats.record_rejected();
            drop(permit);
            let _ = tx.send(PoolOutcome::Cancelled);
            return;
        }

        self.stats.record_started(wait);
        #[cfg(feature = "metrics")]
        {
            metrics::histogram!("pool_submission_wait_seconds", "pool" => self.config.name.clone())
                .record(wait.as_secs_f64());
            metrics::gauge!("pool_tasks_running", "pool" => self.config.name.clone()).set(self.running() as f64);
        }
        self.emit(PoolEvent::TaskSubmitted {
            pool_name: self.config.name.clone(),
            timestamp: Instant::now(),
            running: self.running(),
        });

        let start = Instant::now();
        let result = std::panic::AssertUnwindSafe(task).catch_unwind().await;
        let duration = start.elapsed();
        drop(permit);

        #[cfg(feature = "metrics")]
        metrics::gauge!("pool_tasks_running", "pool" => self.config.name.clone()).set(self.running() as f64);

        match result {
            Ok(value) => {
                self.stats.record_completed(true);
                #[cfg(feature = "metrics")]
                metrics::counter!("pool_tasks_completed_total", "pool" => self.config.name.clone()).increment(1);
                self.emit(PoolEvent::TaskCompleted {
                    pool_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    duration,
                    succeeded: true,
                });
                let _ = tx.send(PoolOutcome::Completed(value));
            }
            Err(payload) => {
                self.stats.record_panic();
                let message = panic_message(&payload);
                self.config.panic_handler.handle(&self.config.name, &message);
                #[cfg(feature = "metrics")]
                metrics::counter!("pool_tasks_panicked_total", "pool" => self.config.name.clone()).increment(1);
                self.emit(PoolEvent::TaskPanicked {
                    pool_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    message,
                });
                let _ = tx.send(PoolOutcome::Panicked);
            }
        }
    }

    fn reject_overloaded(&self) {
        self.stats.record_rejected();
        #[cfg(feature = "metrics")]
        metrics::counter!("pool_tasks_rejected_total", "pool" => self.config.name.clone()).increment(1);
        self.emit(PoolEvent::TaskRejected {
            pool_name: self.config.name.clone(),
            timestamp: Instant::now(),
            capacity: self.capacity(),
        });
    }

    fn emit(&self, event: PoolEvent) {
        self.config.event_listeners.emit(&event);
    }

    /// Atomically changes capacity. Growing adds permits immediately;
    /// shrinking forgets currently-free permits on a best-effort basis (a
    /// permit held by an in-flight task cannot be revoked, so capacity may
    /// take a moment to fully settle after a decrease under load).
    pub fn tune(&self, new_capacity: usize) {
        let old = self.capacity.swap(new_capacity, Ordering::SeqCst);
        match new_capacity.cmp(&old) {
            std::cmp::Ordering::Greater => {
                self.semaphore.add_permits(new_capacity - old);
            }
            std::cmp::Ordering::Less => {
                let mut to_forget = old - new_capacity;
                while to_forget > 0 {
                    match Arc::clone(&self.semaphore).try_acquire_owned() {
                        Ok(permit) => {
                            permit.forget();
                            to_forget -= 1;
                        }
                        Err(_) => break,
                    }
                }
            }
            std::cmp::Ordering::Equal => {}
        }
    }

    /// Closes the pool. Idempotent: only the first call emits
    /// [`PoolEvent::PoolReleased`] or closes the semaphore.
    pub fn release(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.semaphore.close();
            self.emit(PoolEvent::PoolReleased {
                pool_name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        }
    }

    /// Closes the pool and waits up to `timeout` for in-flight tasks to drain.
    pub async fn release_with_timeout(&self, timeout: Duration) -> Result<()> {
        self.release();
        let start = Instant::now();
        while self.running() > 0 {
            if start.elapsed() >= timeout {
                return Err(PoolError::ReleaseTimeout {
                    pool: self.config.name.clone(),
                });
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use std::sync::atomic::AtomicU32;

    fn test_pool(capacity: usize, blocking: bool) -> Arc<Pool> {
        let config = PoolConfig::builder()
            .name("test")
            .capacity(capacity)
            .blocking(blocking)
            .build()
            .unwrap();
        Pool::new(config)
    }

    #[tokio::test]
    async fn submit_runs_task_and_updates_stats() {
        let pool = test_pool(5, true);
        let outcome = pool.submit(async { 42 }).await.unwrap().await;
        assert!(matches!(outcome, PoolOutcome::Completed(42)));
        let stats = pool.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn submit_recovers_panics() {
        let pool = test_pool(5, true);
        let outcome = pool
            .submit(async {
                panic!("boom");
                #[allow(unreachable_code)]
                0
            })
            .await
            .unwrap()
            .await;
        assert!(matches!(outcome, PoolOutcome::Panicked));
        let stats = pool.stats();
        assert_eq!(stats.panics_recovered, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.is_consistent());

        // pool still accepts a subsequent submission
        let outcome = pool.submit(async { 1 }).await.unwrap().await;
        assert!(matches!(outcome, PoolOutcome::Completed(1)));
    }

    #[tokio::test]
    async fn nonblocking_pool_rejects_when_queue_full() {
        let config = PoolConfig::builder()
            .name("test")
            .capacity(1)
            .blocking(false)
            .max_waiting(Some(0))
            .build()
            .unwrap();
        let pool = Pool::new(config);

        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let _first = pool
            .submit(async move {
                gate_clone.notified().await;
            })
            .await
            .unwrap();

        let second = pool.submit(async { 1 }).await;
        assert!(matches!(second, Err(PoolError::Overload { .. })));
        gate.notify_one();
    }

    #[tokio::test]
    async fn blocking_pool_rejects_when_waiting_full() {
        let config = PoolConfig::builder()
            .name("test")
            .capacity(1)
            .blocking(true)
            .max_waiting(Some(0))
            .build()
            .unwrap();
        let pool = Pool::new(config);

        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let _first = pool
            .submit(async move {
                gate_clone.notified().await;
            })
            .await
            .unwrap();

        let second = pool.submit(async { 1 }).await;
        assert!(matches!(second, Err(PoolError::Overload { .. })));
        gate.notify_one();
    }

    #[tokio::test]
    async fn pre_cancelled_context_never_enqueues() {
        let pool = test_pool(5, true);
        let ctx = CancellationToken::new();
        ctx.cancel();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let result = pool
            .submit_with_context(
                &ctx,
                async move {
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;
        assert!(matches!(result, Err(PoolError::CancellationError)));
        assert_eq!(pool.stats().submitted, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn closed_pool_rejects_submissions() {
        let pool = test_pool(5, true);
        pool.release();
        assert!(pool.is_closed());
        let result = pool.submit(async { 1 }).await;
        assert!(matches!(result, Err(PoolError::Closed { .. })));
        assert_eq!(pool.stats().rejected, 1);
        assert_eq!(pool.stats().submitted, 1);
        assert!(pool.stats().is_consistent());
    }

    #[tokio::test]
    async fn release_with_timeout_waits_for_drain() {
        let pool = test_pool(5, true);
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let task = pool
            .submit(async move {
                gate_clone.notified().await;
            })
            .await
            .unwrap();
        gate.notify_one();
        task.await;
        pool.release_with_timeout(Duration::from_millis(500))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tune_grows_capacity() {
        let pool = test_pool(1, false);
        pool.tune(3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.free(), 3);
    }

    #[tokio::test]
    async fn submit_with_timeout_times_out_when_saturated() {
        let pool = test_pool(1, true);
        let gate = Arc::new(tokio::sync::Notify::new());
        let gate_clone = Arc::clone(&gate);
        let _first = pool
            .submit(async move {
                gate_clone.notified().await;
            })
            .await
            .unwrap();

        let result = pool
            .submit_with_timeout(Duration::from_millis(20), async { 1 })
            .await;
        assert!(matches!(result, Err(PoolError::Timeout)));
        gate.notify_one();
    }
}
