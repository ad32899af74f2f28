//! Request interceptor chain: an ordered before/handler/after pipeline of
//! middleware with a lock-free hot path, object-pooled request/response
//! envelopes, and a type-erased metadata bag for cross-middleware signalling.
//!
//! The canonical middlewares (logging, timing, caching, retry advisory,
//! circuit breaking, rate limiting, validation, transformation,
//! authentication) live under [`middlewares`].

pub mod chain;
pub mod error;
pub mod events;
pub mod metadata;
pub mod middleware;
pub mod middlewares;
pub mod objectpool;
pub mod request;
pub mod response;

pub use chain::{Chain, HandlerFn};
pub use error::{ChainError, Result};
pub use events::ChainEvent;
pub use metadata::Metadata;
pub use middleware::Middleware;
pub use objectpool::{PooledRequest, PooledResponse, RequestPool, ResponsePool};
pub use request::Request;
pub use response::{Response, TokenUsage};
