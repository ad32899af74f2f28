//! Primary/secondary distributed checkpointer with replication, failover,
//! and delayed failback.
//!
//! `DistributedCheckpointer<S>` composes a primary and optional secondary
//! [`CheckpointBackend`], tracked through one `tokio::sync::RwLock` over
//! [`ActiveState`] (active backend tag, health flags, failover bookkeeping)
//! directly modeled on a health-check wrapper's background-task
//! / `RwLock<Vec<_>>` structure, reusing its `tokio::time::interval`
//! health-probe loop shape for the failback prober. Async replication uses
//! a bounded `tokio::sync::mpsc::channel` drained by a configurable number
//! of worker tasks, matching the channel-plus-worker-pool idiom the pool
//! manager already uses for background task dispatch.

use crate::backend::{CheckpointBackend, CheckpointInfo};
use crate::config::{DistributedCheckpointerConfig, ReplicationMode};
use crate::error::{CheckpointError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Which backend is currently receiving reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackend {
    /// The primary backend is active (the steady state).
    Primary,
    /// The secondary backend is active, following a failover.
    Secondary,
}

struct ActiveState {
    active: ActiveBackend,
    primary_healthy: bool,
    secondary_healthy: bool,
    failed_over: bool,
    failover_count: u32,
    last_failover_at: Option<Instant>,
    last_failback_at: Option<Instant>,
}

impl Default for ActiveState {
    fn default() -> Self {
        Self {
            active: ActiveBackend::Primary,
            primary_healthy: true,
            secondary_healthy: true,
            failed_over: false,
            failover_count: 0,
            last_failover_at: None,
            last_failback_at: None,
        }
    }
}

/// A point-in-time snapshot of a [`DistributedCheckpointer`]'s replication state.
#[derive(Debug, Clone, Copy)]
pub struct DistributedCheckpointerStatus {
    /// Which backend is currently active.
    pub active_backend: ActiveBackend,
    /// Whether the primary answered its last health probe.
    pub primary_healthy: bool,
    /// Whether the secondary answered its last health probe.
    pub secondary_healthy: bool,
    /// `true` iff `active_backend == Secondary`.
    pub failed_over: bool,
    /// Total number of failovers performed over this instance's lifetime.
    pub failover_count: u32,
    /// When the most recent failover occurred, if any.
    pub last_failover_at: Option<Instant>,
    /// When the most recent failback occurred, if any.
    pub last_failback_at: Option<Instant>,
}

/// Result of an attempted [`DistributedCheckpointer::try_failover`] call,
/// distinguishing why a failover didn't happen so callers can surface a
/// specific error instead of always falling back to the original one.
enum FailoverOutcome {
    /// The secondary is now active (either just switched, or already was).
    Active,
    /// Failover is disabled, or there is no secondary configured.
    Unavailable,
    /// `max_failover_attempts` has already been reached.
    CeilingReached,
}

enum ReplicationOp<S> {
    Save { thread_id: String, state: S },
    Delete { thread_id: String },
}

/// Composes a primary and optional secondary [`CheckpointBackend`] into one
/// backend that replicates the primary's writes to the secondary and fails
/// over to it when the primary errors.
pub struct DistributedCheckpointer<S> {
    primary: Arc<dyn CheckpointBackend<S>>,
    secondary: Option<Arc<dyn CheckpointBackend<S>>>,
    config: DistributedCheckpointerConfig,
    state: RwLock<ActiveState>,
    replication_tx: AsyncMutex<Option<mpsc::Sender<ReplicationOp<S>>>>,
    worker_handles: AsyncMutex<Vec<JoinHandle<()>>>,
    health_task: AsyncMutex<Option<JoinHandle<()>>>,
    dropped_replications: AtomicU64,
}

impl<S> DistributedCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Composes `primary` and `secondary` under `config`. If `config`
    /// requests [`ReplicationMode::Async`] and a secondary is present,
    /// spawns the replication worker pool immediately; callers still need
    /// to call [`DistributedCheckpointer::start_health_check`] separately
    /// to begin failback probing.
    pub fn new(
        primary: Arc<dyn CheckpointBackend<S>>,
        secondary: Option<Arc<dyn CheckpointBackend<S>>>,
        config: DistributedCheckpointerConfig,
    ) -> Arc<Self> {
        let mut replication_tx = None;
        let mut worker_handles = Vec::new();

        if matches!(config.replication_mode, ReplicationMode::Async) {
            if let Some(secondary) = secondary.clone() {
                let (tx, rx) = mpsc::channel(config.queue_capacity);
                let rx = Arc::new(AsyncMutex::new(rx));
                for _ in 0..config.async_worker_count {
                    let rx = Arc::clone(&rx);
                    let secondary = Arc::clone(&secondary);
                    worker_handles.push(tokio::spawn(async move {
                        loop {
                            let op = { rx.lock().await.recv().await };
                            let Some(op) = op else { break };
                            let ctx = CancellationToken::new();
                            let result = match op {
                                ReplicationOp::Save { thread_id, state } => {
                                    secondary.save(&ctx, &thread_id, state).await
                                }
                                ReplicationOp::Delete { thread_id } => {
                                    secondary.delete(&ctx, &thread_id).await
                                }
                            };
                            if let Err(_err) = result {
                                #[cfg(feature = "tracing")]
                                tracing::warn!(error = %_err, "async checkpoint replication failed");
                            }
                        }
                    }));
                }
                replication_tx = Some(tx);
            }
        }

        Arc::new(Self {
            primary,
            secondary,
            config,
            state: RwLock::new(ActiveState::default()),
            replication_tx: AsyncMutex::new(replication_tx),
            worker_handles: AsyncMutex::new(worker_handles),
            health_task: AsyncMutex::new(None),
            dropped_replications: AtomicU64::new(0),
        })
    }

    /// A point-in-time snapshot of the replication/failover state.
    pub async fn status(&self) -> DistributedCheckpointerStatus {
        let state = self.state.read().await;
        DistributedCheckpointerStatus {
            active_backend: state.active,
            primary_healthy: state.primary_healthy,
            secondary_healthy: state.secondary_healthy,
            failed_over: state.failed_over,
            failover_count: state.failover_count,
            last_failover_at: state.last_failover_at,
            last_failback_at: state.last_failback_at,
        }
    }

    /// Number of async replications dropped because the queue was full.
    pub fn dropped_replications(&self) -> u64 {
        self.dropped_replications.load(Ordering::Relaxed)
    }

    /// Starts the periodic health probe that pings both backends and
    /// triggers failback when the primary has recovered and
    /// `failback_delay` has elapsed since the last failover.
    pub async fn start_health_check(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.config.health_check_interval);
            loop {
                interval.tick().await;
                let ctx = CancellationToken::new();
                let primary_ok = this.primary.ping(&ctx).await.is_ok();
                let secondary_ok = match &this.secondary {
                    Some(secondary) => secondary.ping(&ctx).await.is_ok(),
                    None => false,
                };
                {
                    let mut state = this.state.write().await;
                    state.primary_healthy = primary_ok;
                    state.secondary_healthy = secondary_ok;
                }
                this.try_failback().await;
            }
        });
        *self.health_task.lock().await = Some(task);
    }

    /// Stops the health-check loop, then (async mode only) closes the
    /// replication channel and awaits its workers.
    pub async fn close(&self) {
        if let Some(task) = self.health_task.lock().await.take() {
            task.abort();
        }
        // Dropping the sender unblocks every worker's `recv().await` with
        // `None` once the queue has drained.
        let sender = self.replication_tx.lock().await.take();
        drop(sender);
        let handles = std::mem::take(&mut *self.worker_handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn active(&self) -> (ActiveBackend, Arc<dyn CheckpointBackend<S>>) {
        let tag = self.state.read().await.active;
        match tag {
            ActiveBackend::Primary => (tag, Arc::clone(&self.primary)),
            ActiveBackend::Secondary => (
                tag,
                self.secondary
                    .clone()
                    .expect("active state tagged Secondary without a secondary configured"),
            ),
        }
    }

    /// Attempts to switch the active backend from primary to secondary.
    async fn try_failover(&self) -> FailoverOutcome {
        let mut state = self.state.write().await;
        if state.active == ActiveBackend::Secondary {
            return FailoverOutcome::Active;
        }
        if !self.config.auto_failover || self.secondary.is_none() {
            return FailoverOutcome::Unavailable;
        }
        if state.failover_count >= self.config.max_failover_attempts {
            return FailoverOutcome::CeilingReached;
        }
        state.active = ActiveBackend::Secondary;
        state.failed_over = true;
        state.failover_count += 1;
        state.last_failover_at = Some(Instant::now());
        FailoverOutcome::Active
    }

    /// Re-reads `failed_over` after acquiring the write lock rather than
    /// trusting the read-only snapshot the health-check loop took before
    /// calling in, so a racing [`Self::try_failover`] is never clobbered by
    /// a failback decided against stale state (resolving the lock
    /// discipline question from the design notes).
    ///
    /// `strict` distinguishes the two callers: the background health-check
    /// loop (`strict = false`) silently no-ops until every condition lines
    /// up, while [`Self::force_failback`] (`strict = true`) surfaces the
    /// specific unmet condition instead of pretending nothing happened.
    async fn failback_inner(&self, strict: bool) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.failed_over || state.active != ActiveBackend::Secondary {
            return Ok(());
        }
        if !state.primary_healthy {
            return if strict {
                Err(CheckpointError::Backend {
                    detail: "primary has not yet passed a health probe".to_string(),
                })
            } else {
                Ok(())
            };
        }
        let elapsed = state
            .last_failover_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::MAX);
        if elapsed < self.config.failback_delay {
            return if strict {
                Err(CheckpointError::FailbackDelayUnmet)
            } else {
                Ok(())
            };
        }
        state.active = ActiveBackend::Primary;
        state.failed_over = false;
        state.last_failback_at = Some(Instant::now());
        Ok(())
    }

    async fn try_failback(&self) {
        let _ = self.failback_inner(false).await;
    }

    /// Forces an immediate failback attempt outside the periodic
    /// health-check loop, e.g. for an operator-triggered recovery endpoint.
    /// Unlike the background loop, this surfaces *why* failback didn't
    /// happen: [`CheckpointError::FailbackDelayUnmet`] if `failback_delay`
    /// hasn't elapsed yet, or a backend error if the primary isn't healthy.
    /// A no-op (`Ok(())`) if the checkpointer isn't currently failed over.
    pub async fn force_failback(&self) -> Result<()> {
        self.failback_inner(true).await
    }

    /// Replicates a save/delete to the secondary. Only called for
    /// operations that succeeded against the primary — once failed over,
    /// writes land directly on the (now-active) secondary and there is
    /// nothing left to replicate to.
    async fn replicate(&self, ctx: &CancellationToken, op: ReplicationOp<S>) {
        let Some(secondary) = self.secondary.as_ref() else {
            return;
        };
        match self.config.replication_mode {
            ReplicationMode::Sync => {
                let result = match op {
                    ReplicationOp::Save { thread_id, state } => {
                        secondary.save(ctx, &thread_id, state).await
                    }
                    ReplicationOp::Delete { thread_id } => secondary.delete(ctx, &thread_id).await,
                };
                if let Err(_err) = result {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_err, "sync checkpoint replication failed");
                }
            }
            ReplicationMode::Async => {
                let guard = self.replication_tx.lock().await;
                if let Some(tx) = guard.as_ref() {
                    if tx.try_send(op).is_err() {
                        self.dropped_replications.fetch_add(1, Ordering::Relaxed);
                        #[cfg(feature = "tracing")]
                        tracing::warn!("checkpoint replication queue full; dropping replication");
                    }
                }
            }
        }
    }

    /// Saves `state` for `thread_id` against the active backend,
    /// replicating to the secondary (primary-active case only) and
    /// attempting a failover-and-retry once if the active backend errors.
    pub async fn save(&self, ctx: &CancellationToken, thread_id: &str, state: S) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(CheckpointError::CancellationError);
        }
        let (tag, backend) = self.active().await;
        match backend.save(ctx, thread_id, state.clone()).await {
            Ok(()) => {
                if tag == ActiveBackend::Primary {
                    self.replicate(
                        ctx,
                        ReplicationOp::Save {
                            thread_id: thread_id.to_string(),
                            state,
                        },
                    )
                    .await;
                }
                Ok(())
            }
            Err(err) => {
                if tag != ActiveBackend::Primary {
                    return Err(err);
                }
                match self.try_failover().await {
                    FailoverOutcome::Active => {
                        let secondary =
                            self.secondary.clone().ok_or(CheckpointError::NoSecondary)?;
                        secondary.save(ctx, thread_id, state).await
                    }
                    FailoverOutcome::CeilingReached => Err(CheckpointError::MaxFailoverReached),
                    FailoverOutcome::Unavailable => Err(err),
                }
            }
        }
    }

    /// Loads `thread_id`'s current checkpoint from the active backend,
    /// failing over to the secondary once if the active backend errors.
    pub async fn load(&self, ctx: &CancellationToken, thread_id: &str) -> Result<S> {
        if ctx.is_cancelled() {
            return Err(CheckpointError::CancellationError);
        }
        let (tag, backend) = self.active().await;
        match backend.load(ctx, thread_id).await {
            Ok(state) => Ok(state),
            Err(err) => {
                if tag != ActiveBackend::Primary {
                    return Err(err);
                }
                match self.try_failover().await {
                    FailoverOutcome::Active => {
                        let secondary =
                            self.secondary.clone().ok_or(CheckpointError::NoSecondary)?;
                        secondary.load(ctx, thread_id).await
                    }
                    FailoverOutcome::CeilingReached => Err(CheckpointError::MaxFailoverReached),
                    FailoverOutcome::Unavailable => Err(err),
                }
            }
        }
    }

    /// Lists every thread's checkpoint metadata from the active backend.
    pub async fn list(&self, ctx: &CancellationToken) -> Result<Vec<CheckpointInfo>> {
        if ctx.is_cancelled() {
            return Err(CheckpointError::CancellationError);
        }
        let (tag, backend) = self.active().await;
        match backend.list(ctx).await {
            Ok(entries) => Ok(entries),
            Err(err) => {
                if tag != ActiveBackend::Primary {
                    return Err(err);
                }
                match self.try_failover().await {
                    FailoverOutcome::Active => {
                        let secondary =
                            self.secondary.clone().ok_or(CheckpointError::NoSecondary)?;
                        secondary.list(ctx).await
                    }
                    FailoverOutcome::CeilingReached => Err(CheckpointError::MaxFailoverReached),
                    FailoverOutcome::Unavailable => Err(err),
                }
            }
        }
    }

    /// Deletes `thread_id` from the active backend, replicating the
    /// deletion to the secondary (primary-active case only).
    pub async fn delete(&self, ctx: &CancellationToken, thread_id: &str) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(CheckpointError::CancellationError);
        }
        let (tag, backend) = self.active().await;
        match backend.delete(ctx, thread_id).await {
            Ok(()) => {
                if tag == ActiveBackend::Primary {
                    self.replicate(
                        ctx,
                        ReplicationOp::Delete {
                            thread_id: thread_id.to_string(),
                        },
                    )
                    .await;
                }
                Ok(())
            }
            Err(err) => {
                if tag != ActiveBackend::Primary {
                    return Err(err);
                }
                match self.try_failover().await {
                    FailoverOutcome::Active => {
                        let secondary =
                            self.secondary.clone().ok_or(CheckpointError::NoSecondary)?;
                        secondary.delete(ctx, thread_id).await
                    }
                    FailoverOutcome::CeilingReached => Err(CheckpointError::MaxFailoverReached),
                    FailoverOutcome::Unavailable => Err(err),
                }
            }
        }
    }

    /// Returns whether `thread_id` exists on the active backend, failing
    /// over to the secondary once if the active backend errors.
    pub async fn exists(&self, ctx: &CancellationToken, thread_id: &str) -> Result<bool> {
        if ctx.is_cancelled() {
            return Err(CheckpointError::CancellationError);
        }
        let (tag, backend) = self.active().await;
        match backend.exists(ctx, thread_id).await {
            Ok(exists) => Ok(exists),
            Err(err) => {
                if tag != ActiveBackend::Primary {
                    return Err(err);
                }
                match self.try_failover().await {
                    FailoverOutcome::Active => {
                        let secondary =
                            self.secondary.clone().ok_or(CheckpointError::NoSecondary)?;
                        secondary.exists(ctx, thread_id).await
                    }
                    FailoverOutcome::CeilingReached => Err(CheckpointError::MaxFailoverReached),
                    FailoverOutcome::Unavailable => Err(err),
                }
            }
        }
    }
}

#[async_trait]
impl<S> CheckpointBackend<S> for DistributedCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn save(&self, ctx: &CancellationToken, thread_id: &str, state: S) -> Result<()> {
        self.save(ctx, thread_id, state).await
    }

    async fn load(&self, ctx: &CancellationToken, thread_id: &str) -> Result<S> {
        self.load(ctx, thread_id).await
    }

    async fn list(&self, ctx: &CancellationToken) -> Result<Vec<CheckpointInfo>> {
        self.list(ctx).await
    }

    async fn delete(&self, ctx: &CancellationToken, thread_id: &str) -> Result<()> {
        self.delete(ctx, thread_id).await
    }

    async fn exists(&self, ctx: &CancellationToken, thread_id: &str) -> Result<bool> {
        self.exists(ctx, thread_id).await
    }

    async fn ping(&self, ctx: &CancellationToken) -> Result<()> {
        let (_, backend) = self.active().await;
        backend.ping(ctx).await
    }
}
