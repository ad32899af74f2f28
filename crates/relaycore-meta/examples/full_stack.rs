//! Example demonstrating each subsystem working independently:
//! - Worker pool: bounded concurrency with panic recovery
//! - Interceptor chain: a circuit breaker middleware around a flaky handler
//! - Rate limiter: fixed window admission control
//! - Distributed checkpointer: primary/secondary failover
//!
//! Composing all four into a single request path is left to the embedding
//! service: each subsystem is independently usable and makes no assumption
//! about the others.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use relaycore_checkpoint::{DistributedCheckpointer, DistributedCheckpointerConfig};
use relaycore_chain::middlewares::{CircuitBreakerMiddleware, CircuitOpenError};
use relaycore_chain::{Chain, Middleware, Request, Response};
use relaycore_core::{ProviderOptions, SamplerKind, ServiceMetadata};
use relaycore_pool::{Pool, PoolConfig, PoolOutcome};
use relaycore_ratelimit::{FixedWindowBackend, RateLimiterBackend};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    println!("Relaycore - Subsystem Showcase");
    println!("==============================\n");

    demo_pool().await;
    demo_chain_circuit_breaker().await;
    demo_rate_limiter().await;
    demo_checkpoint().await;
    demo_tracing_provider();

    println!("\n=== All Subsystems Demonstrated ===");
}

async fn demo_pool() {
    println!("--- Demo 1: Worker Pool ---");

    let pool = Pool::new(PoolConfig::builder().name("demo-pool").capacity(3).build().unwrap());

    for i in 1..=5 {
        let task = pool.submit(async move { i * i }).await.unwrap();
        match task.await {
            PoolOutcome::Completed(result) => println!("  Task {i}: completed with {result}"),
            PoolOutcome::Panicked => println!("  Task {i}: panicked"),
            PoolOutcome::Cancelled => println!("  Task {i}: cancelled"),
        }
    }

    println!("  stats: {:?}\n", pool.stats());
}

async fn demo_chain_circuit_breaker() {
    println!("--- Demo 2: Interceptor Chain + Circuit Breaker ---");

    let call_count = Arc::new(AtomicUsize::new(0));
    let cc = Arc::clone(&call_count);

    let chain: Chain<(), (), (), CircuitOpenError> = Chain::new("demo", move |_req| {
        let cc = Arc::clone(&cc);
        Box::pin(async move {
            let count = cc.fetch_add(1, Ordering::SeqCst) + 1;
            if count % 3 == 0 {
                Ok(Response::new(()))
            } else {
                Err(CircuitOpenError)
            }
        })
    });

    let breaker = Arc::new(CircuitBreakerMiddleware::new("demo-breaker", 2, Duration::from_secs(60)));
    chain.r#use([breaker.clone() as Arc<dyn Middleware<(), (), (), CircuitOpenError>>]);

    let ctx = CancellationToken::new();
    for i in 1..=10 {
        match chain.execute(&ctx, Request::new(())).await {
            Ok(_) => println!("  Request {i}: Success"),
            Err(_) => println!("  Request {i}: Failed"),
        }
    }

    println!(
        "  Total handler invocations: {}\n",
        call_count.load(Ordering::SeqCst)
    );
}

async fn demo_rate_limiter() {
    println!("--- Demo 3: Rate Limiter ---");

    let limiter = FixedWindowBackend::new(3, Duration::from_secs(1));

    println!("  Sending 6 requests (limit: 3 per second):");
    for i in 1..=6 {
        match limiter.allow("client").await.unwrap() {
            true => println!("  Request {i}: permitted"),
            false => println!("  Request {i}: rejected"),
        }
    }
    println!();
}

async fn demo_checkpoint() {
    println!("--- Demo 4: Distributed Checkpointer ---");

    let primary = relaycore_checkpoint::InMemoryCheckpointer::<String>::new();
    let secondary = relaycore_checkpoint::InMemoryCheckpointer::<String>::new();
    let checkpointer = DistributedCheckpointer::new(primary, Some(secondary), DistributedCheckpointerConfig::default());

    let ctx = CancellationToken::new();
    checkpointer
        .save(&ctx, "conversation-1", "turn 1".to_string())
        .await
        .unwrap();
    let state = checkpointer.load(&ctx, "conversation-1").await.unwrap();
    println!("  Loaded checkpoint: {state}");
    println!("  Status: {:?}\n", checkpointer.status().await);
}

fn demo_tracing_provider() {
    println!("--- Demo 5: Tracing Provider ---");

    let provider = ProviderOptions::new(ServiceMetadata::new("relaycore-demo"))
        .with_sampler(SamplerKind::AlwaysOn)
        .build();
    let tracer = provider.tracer("full_stack_example");

    let span = tracer.start_span("demo_tracing_provider");
    span.set_attribute("demo", "full_stack");
    span.add_event("started");
    span.end();

    let disabled = ProviderOptions::disabled(ServiceMetadata::new("relaycore-demo")).build();
    let noop_span = disabled.tracer("full_stack_example").start_span("unsampled");
    println!("  enabled provider span recording: true");
    println!("  disabled provider span recording: {}", noop_span.is_recording());
    println!();
}
