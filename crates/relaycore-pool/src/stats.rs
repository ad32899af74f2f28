//! Lock-free statistics counters for a [`crate::Pool`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Atomic counters tracking a pool's lifetime activity.
///
/// All fields use relaxed-or-stronger atomics; readers obtain a lock-free
/// snapshot via [`PoolStats::snapshot`] at any time, including concurrently
/// with submissions.
#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    panics_recovered: AtomicU64,
    cumulative_wait_nanos: AtomicU64,
    running: AtomicUsize,
    waiting: AtomicUsize,
}

impl PoolStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_started(&self, wait: Duration) {
        self.running.fetch_add(1, Ordering::Relaxed);
        self.cumulative_wait_nanos
            .fetch_add(wait.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, ok: bool) {
        self.running.fetch_sub(1, Ordering::Relaxed);
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_panic(&self) {
        self.running.fetch_sub(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.panics_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_waiting(&self) {
        self.waiting.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_waiting(&self) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::Relaxed)
    }

    /// Returns a consistent point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            panics_recovered: self.panics_recovered.load(Ordering::Relaxed),
            cumulative_wait: Duration::from_nanos(self.cumulative_wait_nanos.load(Ordering::Relaxed)),
            running: self.running(),
            waiting: self.waiting(),
        }
    }
}

/// A point-in-time copy of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatsSnapshot {
    /// Total tasks accepted for admission (regardless of later outcome).
    pub submitted: u64,
    /// Tasks that ran to completion without panicking or erroring at the pool level.
    pub completed: u64,
    /// Tasks that panicked, or (reserved for callers) were recorded as failed.
    pub failed: u64,
    /// Tasks rejected at admission time (pool and queue both saturated, or pool closed).
    pub rejected: u64,
    /// Panics caught by the pool's recovery guard; always counted in `failed`.
    pub panics_recovered: u64,
    /// Sum of time every started task spent waiting for a permit.
    pub cumulative_wait: Duration,
    /// Tasks currently executing.
    pub running: usize,
    /// Tasks currently queued waiting for a permit (nonblocking pools) or
    /// submitters currently parked (blocking pools).
    pub waiting: usize,
}

impl PoolStatsSnapshot {
    /// `submitted == completed + failed + rejected`, the pool's core invariant at quiescence.
    pub fn is_consistent(&self) -> bool {
        self.submitted == self.completed + self.failed + self.rejected
    }
}
