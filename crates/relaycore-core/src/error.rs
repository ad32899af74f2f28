//! Common error types shared across relaycore components.
//!
//! This module provides [`ResilienceError`], a unified error type that eliminates
//! the need for manual `From` trait implementations when composing the pool
//! manager, interceptor chain, rate limiter, and checkpointer in one service.
//!
//! # The Problem
//!
//! When using multiple resilience layers (pool, chain circuit breaker, rate
//! limiter, checkpointer, ...) you typically need to write repetitive `From`
//! trait implementations:
//!
//! ```rust,ignore
//! impl From<PoolError> for ServiceError { /* ... */ }
//! impl From<ChainError> for ServiceError { /* ... */ }
//! impl From<RateLimiterError> for ServiceError { /* ... */ }
//! impl From<CheckpointError> for ServiceError { /* ... */ }
//! ```
//!
//! # The Solution
//!
//! Use [`ResilienceError<E>`] as your service error type:
//!
//! ```rust
//! use relaycore_core::ResilienceError;
//!
//! #[derive(Debug, Clone)]
//! enum AppError {
//!     DatabaseDown,
//!     InvalidRequest,
//! }
//!
//! impl std::fmt::Display for AppError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         match self {
//!             AppError::DatabaseDown => write!(f, "Database down"),
//!             AppError::InvalidRequest => write!(f, "Invalid request"),
//!         }
//!     }
//! }
//!
//! impl std::error::Error for AppError {}
//!
//! type ServiceError = ResilienceError<AppError>;
//! ```
//!
//! # Pattern Matching
//!
//! ```rust
//! use relaycore_core::ResilienceError;
//! use std::time::Duration;
//!
//! # #[derive(Debug)]
//! # struct AppError;
//! # impl std::fmt::Display for AppError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { Ok(()) }
//! # }
//! # impl std::error::Error for AppError {}
//! fn handle_error(error: ResilienceError<AppError>) {
//!     match error {
//!         ResilienceError::Timeout { layer } => eprintln!("Timeout in {}", layer),
//!         ResilienceError::CircuitOpen { name } => eprintln!("Circuit breaker {:?} is open", name),
//!         ResilienceError::PoolOverload { concurrent_calls, max_concurrent } => {
//!             eprintln!("Pool overloaded: {}/{}", concurrent_calls, max_concurrent);
//!         }
//!         ResilienceError::PoolClosed { pool } => eprintln!("Pool '{}' is closed", pool),
//!         ResilienceError::RateLimited { retry_after } => {
//!             eprintln!("Rate limited, retry after {:?}", retry_after);
//!         }
//!         ResilienceError::CheckpointBackend { detail } => eprintln!("Checkpoint backend: {}", detail),
//!         ResilienceError::Application(app_err) => eprintln!("Application error: {}", app_err),
//!     }
//! }
//! ```
//!
//! # Helper Methods
//!
//! ```rust
//! use relaycore_core::ResilienceError;
//!
//! # #[derive(Debug)]
//! # struct AppError;
//! # impl std::fmt::Display for AppError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { Ok(()) }
//! # }
//! # impl std::error::Error for AppError {}
//! # let error: ResilienceError<AppError> = ResilienceError::Timeout { layer: "test" };
//! if error.is_timeout() {
//!     // Handle timeout from any layer
//! } else if error.is_application() {
//!     let app_error = error.application_error().unwrap();
//!     // Handle application-specific error
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// A common error type that wraps all relaycore component errors.
///
/// This allows application code to compose the pool manager, interceptor
/// chain, rate limiter, and checkpointer without writing per-component error
/// conversion code. Each component error converts into the appropriate
/// `ResilienceError` variant via its own `From` impl.
///
/// # Type Parameters
///
/// - `E`: The application-specific error type from the wrapped handler
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// A timeout occurred (pool submission, checkpoint I/O, ...).
    Timeout {
        /// The component that timed out (e.g., "pool", "checkpoint").
        layer: &'static str,
    },

    /// Circuit breaker is open, call rejected.
    CircuitOpen {
        /// Circuit breaker name (if configured).
        name: Option<String>,
    },

    /// A bounded pool is at capacity, submission rejected.
    PoolOverload {
        /// Current number of in-flight tasks.
        concurrent_calls: usize,
        /// Maximum concurrent tasks allowed.
        max_concurrent: usize,
    },

    /// Submission to a pool that has already been released.
    PoolClosed {
        /// Name of the closed pool.
        pool: String,
    },

    /// Rate limiter rejected the call.
    RateLimited {
        /// How long to wait before retrying, if known.
        retry_after: Option<Duration>,
    },

    /// The checkpointer backend reported an error (primary and, where
    /// applicable, secondary both failed or no healthy secondary existed).
    CheckpointBackend {
        /// Human-readable backend error detail.
        detail: String,
    },

    /// The underlying application handler returned an error.
    Application(E),
}

impl<E> fmt::Display for ResilienceError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::Timeout { layer } => write!(f, "timeout in {}", layer),
            ResilienceError::CircuitOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open", n),
                None => write!(f, "circuit breaker is open"),
            },
            ResilienceError::PoolOverload {
                concurrent_calls,
                max_concurrent,
            } => write!(f, "pool overloaded ({}/{})", concurrent_calls, max_concurrent),
            ResilienceError::PoolClosed { pool } => write!(f, "pool '{}' is closed", pool),
            ResilienceError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limited, retry after {:?}", d),
                None => write!(f, "rate limited"),
            },
            ResilienceError::CheckpointBackend { detail } => {
                write!(f, "checkpoint backend error: {}", detail)
            }
            ResilienceError::Application(e) => write!(f, "application error: {}", e),
        }
    }
}

impl<E> std::error::Error for ResilienceError<E> where E: std::error::Error {}

// From implementations for each component error are provided by the
// individual crates (relaycore-pool, relaycore-chain, ...) to avoid
// circular dependencies.

impl<E> ResilienceError<E> {
    /// Returns `true` if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// Returns `true` if this is a circuit breaker error.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if this is a pool overload error.
    pub fn is_pool_overload(&self) -> bool {
        matches!(self, ResilienceError::PoolOverload { .. })
    }

    /// Returns `true` if this is a pool-closed error.
    pub fn is_pool_closed(&self) -> bool {
        matches!(self, ResilienceError::PoolClosed { .. })
    }

    /// Returns `true` if this is a rate limiter error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResilienceError::RateLimited { .. })
    }

    /// Returns `true` if this is a checkpoint backend error.
    pub fn is_checkpoint_backend(&self) -> bool {
        matches!(self, ResilienceError::CheckpointBackend { .. })
    }

    /// Returns `true` if this is an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    ///
    /// # Examples
    ///
    /// ```
    /// use relaycore_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Application("error".to_string());
    /// let mapped: ResilienceError<usize> = err.map_application(|s| s.len());
    /// assert_eq!(mapped.application_error(), Some(5));
    /// ```
    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::Timeout { layer } => ResilienceError::Timeout { layer },
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::PoolOverload {
                concurrent_calls,
                max_concurrent,
            } => ResilienceError::PoolOverload {
                concurrent_calls,
                max_concurrent,
            },
            ResilienceError::PoolClosed { pool } => ResilienceError::PoolClosed { pool },
            ResilienceError::RateLimited { retry_after } => {
                ResilienceError::RateLimited { retry_after }
            }
            ResilienceError::CheckpointBackend { detail } => {
                ResilienceError::CheckpointBackend { detail }
            }
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}
