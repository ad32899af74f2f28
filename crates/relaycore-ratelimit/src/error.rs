//! Error types for the rate limiter.

/// Errors a rate limiter backend can return.
///
/// Per the admission-path fail-open policy, callers should treat any of
/// these (other than a deliberate `reset`/`allow` returning `Ok(false)`) as
/// "admit the request" rather than rejecting it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimiterError {
    /// The backend storage reported an error (connection failure, etc.).
    #[error("rate limiter backend error: {detail}")]
    Backend {
        /// Human-readable backend detail.
        detail: String,
    },

    /// The supplied configuration was invalid (e.g. zero-length window).
    #[error("invalid rate limiter configuration: {detail}")]
    InvalidConfig {
        /// Human-readable detail.
        detail: String,
    },

    /// The calling context was cancelled before the operation completed.
    #[error("operation cancelled")]
    CancellationError,
}

/// Result type for rate limiter operations.
pub type Result<T> = std::result::Result<T, RateLimiterError>;

impl<E> From<RateLimiterError> for relaycore_core::ResilienceError<E> {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::Backend { .. } | RateLimiterError::CancellationError => {
                Self::RateLimited { retry_after: None }
            }
            RateLimiterError::InvalidConfig { .. } => Self::RateLimited { retry_after: None },
        }
    }
}
