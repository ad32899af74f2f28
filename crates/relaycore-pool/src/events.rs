//! Observability events emitted by a [`crate::Pool`].

use relaycore_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted during the lifetime of a pool.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A task was admitted and spawned.
    TaskSubmitted {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// In-flight task count immediately after admission.
        running: usize,
    },
    /// A task was rejected because the pool (and queue) were saturated.
    TaskRejected {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Configured capacity at rejection time.
        capacity: usize,
    },
    /// A task completed, successfully or not.
    TaskCompleted {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time spent running (excludes queueing).
        duration: Duration,
        /// Whether the task returned without panicking.
        succeeded: bool,
    },
    /// A submitted task panicked; recovered by the pool's guard.
    TaskPanicked {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Panic message, if it could be extracted.
        message: String,
    },
    /// The pool was released (idempotent; only the first call emits this).
    PoolReleased {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for PoolEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::TaskSubmitted { .. } => "task_submitted",
            PoolEvent::TaskRejected { .. } => "task_rejected",
            PoolEvent::TaskCompleted { .. } => "task_completed",
            PoolEvent::TaskPanicked { .. } => "task_panicked",
            PoolEvent::PoolReleased { .. } => "pool_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PoolEvent::TaskSubmitted { timestamp, .. }
            | PoolEvent::TaskRejected { timestamp, .. }
            | PoolEvent::TaskCompleted { timestamp, .. }
            | PoolEvent::TaskPanicked { timestamp, .. }
            | PoolEvent::PoolReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PoolEvent::TaskSubmitted { pool_name, .. }
            | PoolEvent::TaskRejected { pool_name, .. }
            | PoolEvent::TaskCompleted { pool_name, .. }
            | PoolEvent::TaskPanicked { pool_name, .. }
            | PoolEvent::PoolReleased { pool_name, .. } => pool_name,
        }
    }
}
