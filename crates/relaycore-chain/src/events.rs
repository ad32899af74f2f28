//! Observability events emitted by the interceptor chain.

use relaycore_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted over the lifetime of a chain execution.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// A middleware's `before` hook ran successfully.
    BeforeRan {
        /// Name of the chain (its configured label, or `"chain"`).
        chain_name: String,
        /// Name of the middleware.
        middleware: String,
        timestamp: Instant,
    },
    /// A middleware's `after` hook ran successfully.
    AfterRan {
        chain_name: String,
        middleware: String,
        timestamp: Instant,
    },
    /// A hook returned an error that aborted the chain.
    Aborted {
        chain_name: String,
        middleware: String,
        timestamp: Instant,
    },
    /// A cached response short-circuited the handler.
    CacheHit {
        chain_name: String,
        timestamp: Instant,
    },
    /// A full execution completed (success or suppressed-error path).
    ExecutionCompleted {
        chain_name: String,
        timestamp: Instant,
        duration: Duration,
        succeeded: bool,
    },
}

impl ResilienceEvent for ChainEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChainEvent::BeforeRan { .. } => "before_ran",
            ChainEvent::AfterRan { .. } => "after_ran",
            ChainEvent::Aborted { .. } => "aborted",
            ChainEvent::CacheHit { .. } => "cache_hit",
            ChainEvent::ExecutionCompleted { .. } => "execution_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ChainEvent::BeforeRan { timestamp, .. }
            | ChainEvent::AfterRan { timestamp, .. }
            | ChainEvent::Aborted { timestamp, .. }
            | ChainEvent::CacheHit { timestamp, .. }
            | ChainEvent::ExecutionCompleted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ChainEvent::BeforeRan { chain_name, .. }
            | ChainEvent::AfterRan { chain_name, .. }
            | ChainEvent::Aborted { chain_name, .. }
            | ChainEvent::CacheHit { chain_name, .. }
            | ChainEvent::ExecutionCompleted { chain_name, .. } => chain_name,
        }
    }
}
