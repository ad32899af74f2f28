//! Error types for the interceptor chain.

/// Errors the chain itself can surface, distinct from the application
/// error `E` a handler or middleware hook produces.
///
/// `E` is the same application error type the chain is generic over
/// (see [`crate::Chain`]), so a hook's own error and the chain's own
/// abort reasons compose into a single type the caller matches on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError<E> {
    /// A `before`/`after` hook returned an error that was not suppressed by
    /// that middleware's `on_error`.
    #[error("middleware '{middleware}' aborted the chain: {source}")]
    MiddlewareAborted {
        /// Name of the middleware that aborted execution.
        middleware: String,
        /// The underlying error.
        #[source]
        source: Box<ChainError<E>>,
    },

    /// The chain-level circuit breaker middleware rejected the call.
    #[error("circuit breaker is open")]
    CircuitOpen {
        /// Name of the circuit breaker instance, if configured.
        name: Option<String>,
    },

    /// The chain-level rate limiter middleware rejected the call.
    #[error("rate limited")]
    RateLimited,

    /// The handler itself returned an application error.
    #[error("handler error: {0}")]
    Handler(E),
}

/// Result type for chain operations.
pub type Result<T, E> = std::result::Result<T, ChainError<E>>;

impl<E> From<ChainError<E>> for relaycore_core::ResilienceError<E> {
    fn from(err: ChainError<E>) -> Self {
        match err {
            ChainError::CircuitOpen { name } => Self::CircuitOpen { name },
            ChainError::RateLimited => Self::RateLimited { retry_after: None },
            ChainError::Handler(e) => Self::Application(e),
            // A middleware-aborted chain carries its own `ChainError<E>`
            // cause, which does not fit any dedicated `ResilienceError`
            // variant; it is reported as a timeout-layer error, matching
            // the pool crate's handling of its own non-hot-path variants.
            ChainError::MiddlewareAborted { .. } => Self::Timeout { layer: "chain" },
        }
    }
}
