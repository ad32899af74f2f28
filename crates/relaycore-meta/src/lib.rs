//! Worker pools, interceptor chains, rate limiting, and distributed
//! checkpointing for request-processing services.
//!
//! `relaycore` collects the building blocks a long-running request-serving
//! process needs around its actual request handling: bounded concurrency,
//! cross-cutting request middleware, per-key throughput control, and
//! durable per-thread state. Each subsystem is available as both an
//! individual crate and as a feature in this meta-crate.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! relaycore = { version = "0.1", features = ["pool", "chain"] }
//! ```
//!
//! # Subsystems
//!
//! - **[Worker Pool]** - Named, capacity-bounded task execution with panic recovery
//! - **[Interceptor Chain]** - Before/handler/after middleware pipeline
//! - **[Rate Limiter]** - Fixed and sliding window admission control
//! - **[Distributed Checkpointer]** - Primary/secondary state replication with failover
//!
//! [Worker Pool]: #worker-pool
//! [Interceptor Chain]: #interceptor-chain
//! [Rate Limiter]: #rate-limiter
//! [Distributed Checkpointer]: #distributed-checkpointer
//!
//! # Subsystem Guides
//!
//! ## Worker Pool
//!
//! A named pool of capacity-bounded concurrent task slots, independent of
//! any particular service boundary.
//!
//! ### When to Use
//!
//! - **Isolating expensive work**: keep a flood of background jobs from
//!   starving request-handling tasks
//! - **Per-tenant concurrency limits**: one named pool per tenant or queue
//! - **Panic containment**: a panicking task should fail its own submitter,
//!   not take down the process
//! - **Cooperative cancellation**: callers that want to abandon queued work
//!   without leaking the task
//!
//! ### Trade-offs
//!
//! - **Queueing vs rejection**: a full pool either waits for a permit or
//!   fails the submission immediately, depending on how the caller submits
//! - **Registry overhead**: named pools live in a process-wide registry;
//!   forgetting to release one leaks its semaphore and stats for the
//!   process lifetime
//! - **Stats granularity**: [`relaycore_pool::PoolStats`] tracks aggregate
//!   counters, not per-task latency histograms
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Background Housekeeping
//! ├─ A "background" pool with low capacity
//! ├─ Periodic sweepers (checkpoint cleanup, rate-limiter window GC) submit here
//! ├─ Request-serving tasks run in their own separate pool
//! └─ A GC storm in one pool never starves the other
//!
//! Per-Tenant Isolation
//! ├─ One named pool per tenant ("tenant-42")
//! ├─ A noisy tenant's queue backs up without touching other tenants
//! └─ Pool stats expose per-tenant submitted/rejected/panicked counts
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **One pool for everything**: a single global pool reintroduces the
//! head-of-line blocking pools exist to prevent
//! ✅ Scope pools to the isolation boundary that actually matters
//!
//! ❌ **Never releasing a registry entry**: `PoolRegistry::release` is the
//! only way a named pool's resources are reclaimed
//! ✅ Release pools tied to a scope that actually ends (a test, a tenant
//! offboarding) explicitly
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "pool")]
//! # {
//! use relaycore::pool::{Pool, PoolConfig};
//!
//! # async fn example() {
//! let pool = Pool::new(PoolConfig::builder().name("reports").capacity(10).build().unwrap());
//! let outcome = pool.submit(async { 1 + 1 }).await.unwrap().await;
//! # }
//! # }
//! ```
//!
//! ## Interceptor Chain
//!
//! An ordered before/handler/after pipeline that request-scoped middleware
//! attaches to without the handler itself knowing they exist.
//!
//! ### When to Use
//!
//! - **Cross-cutting request concerns**: logging, timing, auth, validation,
//!   response caching, applied uniformly across many handlers
//! - **Per-request circuit breaking or rate limiting**: a middleware that
//!   short-circuits before the handler ever runs
//! - **Composable request shaping**: transform input or response without
//!   touching the handler
//!
//! ### Trade-offs
//!
//! - **Single error type per chain**: every middleware attached to a chain
//!   shares the chain's error type `E`; composing middlewares with
//!   different native error types needs an adapter or a unifying enum
//! - **Ordering matters**: before-hooks run in registration order,
//!   after-hooks in reverse; middlewares that depend on ordering (a cache
//!   before a circuit breaker, say) must be registered deliberately
//! - **Object pooling overhead**: [`relaycore_chain::RequestPool`] and
//!   [`relaycore_chain::ResponsePool`] trade allocator pressure for a
//!   little bookkeeping
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Authenticated API Gateway
//! ├─ Authenticator middleware rejects unauthenticated requests
//! ├─ Rate limiter middleware enforces per-user quotas
//! ├─ Circuit breaker middleware protects a flaky downstream
//! └─ Logging/timing middlewares observe every request uniformly
//!
//! Response Memoization
//! ├─ Caching middleware short-circuits on a key hit
//! ├─ Handler only runs on a miss
//! └─ Cache entry populated from the handler's response on the way out
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **Mixing unrelated error types in one chain**: forces every
//! middleware to agree on a single `E`
//! ✅ Define one application error enum per chain and have each
//! middleware's hook map into it
//!
//! ❌ **Heavy work in `before`**: before-hooks run for every request, even
//! ones a later middleware will reject
//! ✅ Order cheap rejection checks (rate limiter, circuit breaker) ahead of
//! expensive ones
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "chain")]
//! # {
//! use relaycore::chain::{Chain, Request};
//! use relaycore::chain::middlewares::{CircuitBreakerMiddleware, CircuitOpenError};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let chain: Chain<(), (), (), CircuitOpenError> =
//!     Chain::new("demo", |req| Box::pin(async move { Ok(relaycore::chain::Response::new(())) }));
//! chain.r#use([Arc::new(CircuitBreakerMiddleware::new("demo", 5, Duration::from_secs(30)))
//!     as Arc<dyn relaycore::chain::Middleware<(), (), (), CircuitOpenError>>]);
//! let _ = chain.execute(&CancellationToken::new(), Request::new(())).await;
//! # }
//! # }
//! ```
//!
//! ## Rate Limiter
//!
//! Per-key admission control backed by a fixed-window or sliding-window
//! store.
//!
//! ### When to Use
//!
//! - **Per-client quotas**: cap requests per API key, user, or IP
//! - **Protecting downstream capacity**: shed load before it reaches a
//!   backend with a hard QPS ceiling
//! - **Fleet-wide coordination**: share limiter state across instances
//!   through a common [`relaycore_ratelimit::SortedSetStore`]
//!
//! ### Trade-offs
//!
//! - **Fixed vs sliding**: fixed windows are O(1) memory per key but allow
//!   a 2x burst at window boundaries; sliding windows are precise but cost
//!   O(n) entries per key
//! - **Single-instance vs distributed**: [`relaycore_ratelimit::FixedWindowBackend`]
//!   only sees one instance's traffic; a fleet needs a shared
//!   [`relaycore_ratelimit::SortedSetStore`] behind [`relaycore_ratelimit::SlidingWindowBackend`]
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Per-User API Quota
//! ├─ Free tier: 100 req/min via a fixed window
//! ├─ Key derived from client IP when no user id is present
//! └─ Trusted-proxy CIDR ranges configured for X-Forwarded-For
//!
//! Fleet-Wide Throughput Cap
//! ├─ Sliding window backend over a shared sorted-set store
//! ├─ Every instance in the fleet sees the same counters
//! └─ No single instance can exceed the aggregate quota alone
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **Trusting `X-Forwarded-For` by default**: an untrusted proxy list
//! lets any client spoof its source key
//! ✅ Configure [`relaycore_ratelimit::ClientIpExtractor`] with the actual
//! trusted proxy CIDR ranges
//!
//! ❌ **Fixed window for strict quotas**: a client can burst up to 2x the
//! limit across a window boundary
//! ✅ Use the sliding window backend when boundary bursts are unacceptable
//!
//! ### Example
//!
//! ```rust
//! use relaycore_ratelimit::FixedWindowBackend;
//! use relaycore_ratelimit::RateLimiterBackend;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = FixedWindowBackend::new(100, Duration::from_secs(60));
//! if limiter.allow("client-42").await.unwrap() {
//!     // admit the request
//! }
//! # }
//! ```
//!
//! ## Distributed Checkpointer
//!
//! A per-thread state store that replicates primary writes to a secondary
//! and fails over between them.
//!
//! ### When to Use
//!
//! - **Long-running conversational or agentic state**: persist a thread's
//!   state after each turn so a crash doesn't lose it
//! - **Backend redundancy**: keep serving reads and writes when the
//!   primary store becomes unreachable
//! - **Bounded retention**: wrap any backend with
//!   [`relaycore_checkpoint::AutoCleanupCheckpointer`] to purge stale
//!   threads automatically
//!
//! ### Trade-offs
//!
//! - **Sync vs async replication**: synchronous replication guarantees the
//!   secondary is current at the cost of write latency; asynchronous
//!   replication is faster but can drop replications under sustained load
//! - **Failback delay**: failing back to a recovered primary too eagerly
//!   risks flapping; [`relaycore_checkpoint::DistributedCheckpointerConfig::failback_delay`]
//!   trades recovery speed for stability
//! - **History growth**: [`relaycore_checkpoint::InMemoryCheckpointer`]
//!   appends every prior state to a thread's history; long-lived threads
//!   need a cleanup wrapper or an external backend with its own retention
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Agent Conversation State
//! ├─ Each turn's state saved to the distributed checkpointer
//! ├─ Primary becomes unreachable mid-conversation
//! ├─ Writes fail over to the secondary transparently
//! └─ Health checks fail back once the primary recovers and the delay elapses
//!
//! Bounded In-Memory Store
//! ├─ InMemoryCheckpointer wrapped in AutoCleanupCheckpointer
//! ├─ Background sweeper purges threads untouched past max_age
//! └─ Memory usage stays bounded without an external store
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **No secondary configured with `auto_failover` expectations**: there
//! is nothing to fail over to
//! ✅ Always pair `auto_failover` with a real secondary backend
//!
//! ❌ **Zero failback delay**: a flapping primary causes repeated failover/
//! failback churn
//! ✅ Set a failback delay long enough to rule out a flapping primary
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "checkpoint")]
//! # {
//! use relaycore::checkpoint::{DistributedCheckpointer, DistributedCheckpointerConfig, InMemoryCheckpointer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let primary = InMemoryCheckpointer::<String>::new();
//! let secondary = InMemoryCheckpointer::<String>::new();
//! let checkpointer = DistributedCheckpointer::new(primary, Some(secondary), DistributedCheckpointerConfig::default());
//! checkpointer.save(&CancellationToken::new(), "thread-1", "state".to_string()).await.unwrap();
//! # }
//! # }
//! ```
//!
//! ## Tracing Provider
//!
//! Not a subsystem of its own — a surface the chain and other cross-cutting
//! code consume for span lifecycle and header-based context propagation.
//! [`relaycore_core::TracingProvider`] is built from [`relaycore_core::ProviderOptions`]
//! (exporter kind, sampler, batch parameters) and, when disabled, every
//! operation is a true no-op rather than a disabled-but-still-allocating
//! path.
//!
//! ### Example
//!
//! ```rust
//! # #[cfg(feature = "tracing")]
//! # {
//! use relaycore::core::{ProviderOptions, ServiceMetadata, SamplerKind};
//!
//! let provider = ProviderOptions::new(ServiceMetadata::new("gateway"))
//!     .with_sampler(SamplerKind::Ratio(0.1))
//!     .build();
//! let tracer = provider.tracer("chain");
//! let span = tracer.start_span("handle_request");
//! span.set_attribute("route", "/v1/chat");
//! span.end();
//! # }
//! ```
//!
//! # Composition
//!
//! The subsystems compose in the order a request actually flows through a
//! server: admission control first, then concurrency isolation, then the
//! handler itself.
//!
//! ```text
//! ┌─────────────┐
//! │   Request   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────┐
//! │  Rate Limiter   │ ← reject over-quota clients before any work happens
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Interceptor     │ ← auth, logging, caching, circuit breaking
//! │ Chain           │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Worker Pool    │ ← bound concurrency, recover from panics
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Handler      │ ← checkpoints its state via the distributed
//! └─────────────────┘   checkpointer as it makes progress
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core is always available.
pub use relaycore_core as core;

#[cfg(feature = "pool")]
pub use relaycore_pool as pool;

#[cfg(feature = "chain")]
pub use relaycore_chain as chain;

#[cfg(feature = "ratelimit")]
pub use relaycore_ratelimit as ratelimit;

#[cfg(feature = "checkpoint")]
pub use relaycore_checkpoint as checkpoint;
