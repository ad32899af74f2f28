//! Error types for the checkpointer.

/// Errors that can occur when saving, loading, or replicating checkpoints.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckpointError {
    /// No checkpoint exists for the given thread.
    #[error("no checkpoint for thread '{thread_id}'")]
    NotFound {
        /// Thread ID that was looked up.
        thread_id: String,
    },

    /// The underlying store reported an error (I/O, serialization, connection, ...).
    #[error("checkpoint backend error: {detail}")]
    Backend {
        /// Human-readable backend error detail.
        detail: String,
    },

    /// A distributed wrapper was asked to fail over but has no secondary configured.
    #[error("no secondary backend configured")]
    NoSecondary,

    /// `max_failover_attempts` has already been reached; refusing to oscillate further.
    #[error("maximum failover attempts reached")]
    MaxFailoverReached,

    /// A failback was attempted before `failback_delay` had elapsed since the last failover.
    #[error("failback delay has not yet elapsed")]
    FailbackDelayUnmet,

    /// The operation's cancellation token fired before it completed.
    #[error("operation cancelled")]
    CancellationError,
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

impl<E> From<CheckpointError> for relaycore_core::ResilienceError<E> {
    /// Maps onto the shared error surface. Every variant collapses onto
    /// `CheckpointBackend` except `CancellationError`, which has no
    /// dedicated checkpoint-specific `ResilienceError` variant and falls
    /// back to `Timeout { layer: "checkpoint" }`, matching the pool crate's
    /// treatment of construction/registry-time errors that never occur on
    /// the request hot path.
    fn from(err: CheckpointError) -> Self {
        match err {
            CheckpointError::NotFound { thread_id } => Self::CheckpointBackend {
                detail: format!("no checkpoint for thread '{thread_id}'"),
            },
            CheckpointError::Backend { detail } => Self::CheckpointBackend { detail },
            CheckpointError::NoSecondary => Self::CheckpointBackend {
                detail: "no secondary backend configured".to_string(),
            },
            CheckpointError::MaxFailoverReached => Self::CheckpointBackend {
                detail: "maximum failover attempts reached".to_string(),
            },
            CheckpointError::FailbackDelayUnmet => Self::CheckpointBackend {
                detail: "failback delay has not yet elapsed".to_string(),
            },
            CheckpointError::CancellationError => Self::Timeout { layer: "checkpoint" },
        }
    }
}
