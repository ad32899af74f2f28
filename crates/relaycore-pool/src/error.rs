//! Error types for the pool manager.

/// Errors that can occur when submitting to or managing a pool.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// Submission to a pool that has already been released.
    #[error("pool '{pool}' is closed")]
    Closed {
        /// Name of the closed pool.
        pool: String,
    },

    /// The pool (and its optional queue) are saturated.
    #[error("pool '{pool}' overloaded: {concurrent}/{capacity} in flight")]
    Overload {
        /// Name of the overloaded pool.
        pool: String,
        /// Current number of in-flight or queued tasks.
        concurrent: usize,
        /// Configured capacity.
        capacity: usize,
    },

    /// No pool registered under the given name.
    #[error("pool '{name}' not found")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A pool with this name is already registered.
    #[error("pool '{name}' already registered")]
    AlreadyExists {
        /// Name that collided.
        name: String,
    },

    /// The process-wide registry has not been initialized.
    #[error("pool registry not initialized")]
    ManagerNotInitialized,

    /// Pool construction was given an invalid configuration.
    #[error("invalid pool configuration: {detail}")]
    InvalidConfig {
        /// Human-readable detail.
        detail: String,
    },

    /// A blocking submission's cancellation token fired before a permit was acquired.
    #[error("operation cancelled")]
    CancellationError,

    /// `submit_with_timeout` (or a submission whose context carried a deadline) exceeded it.
    #[error("timed out waiting for pool capacity")]
    Timeout,

    /// `release_with_timeout` exceeded its deadline waiting for in-flight tasks to drain.
    #[error("timed out waiting for pool '{pool}' to drain")]
    ReleaseTimeout {
        /// Name of the pool that did not drain in time.
        pool: String,
    },
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

impl<E> From<PoolError> for relaycore_core::ResilienceError<E> {
    /// Maps onto the shared error surface. The registry/construction-time
    /// variants (`NotFound`, `AlreadyExists`, `ManagerNotInitialized`,
    /// `InvalidConfig`) have no dedicated `ResilienceError` variant of their
    /// own since they never occur on the request hot path; they fall back
    /// to `Timeout { layer: "pool" }` so a composed error surface still
    /// reports the component that failed.
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Closed { pool } => Self::PoolClosed { pool },
            PoolError::Overload {
                concurrent,
                capacity,
                ..
            } => Self::PoolOverload {
                concurrent_calls: concurrent,
                max_concurrent: capacity,
            },
            PoolError::Timeout
            | PoolError::ReleaseTimeout { .. }
            | PoolError::CancellationError
            | PoolError::NotFound { .. }
            | PoolError::AlreadyExists { .. }
            | PoolError::ManagerNotInitialized
            | PoolError::InvalidConfig { .. } => Self::Timeout { layer: "pool" },
        }
    }
}
