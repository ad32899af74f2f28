//! Core infrastructure for relaycore.
//!
//! This crate provides shared functionality used across the pool manager,
//! interceptor chain, rate limiter, and checkpointer:
//! - Event system for observability
//! - The unified [`ResilienceError`] type
//! - Common configuration/builder patterns followed by every other crate
//! - A tracing provider surface (`tracing` feature): span lifecycle,
//!   exporter/sampler composition, and header-based context propagation,
//!   consumed by the chain and other cross-cutting code but owned here

pub mod error;
pub mod events;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use error::ResilienceError;
pub use events::{EventListener, ResilienceEvent};
#[cfg(feature = "tracing")]
pub use tracing::{
    BatchConfig, ExporterKind, NoopProvider, ProviderOptions, SamplerKind, ServiceMetadata, Span,
    TextMapCarrier, Tracer, TracingError, TracingProvider, TracingSubscriberProvider,
};
