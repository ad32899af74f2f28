//! Exercises the rate limiter, interceptor chain, worker pool, and
//! distributed checkpointer together along one simulated request path:
//! admission control, then middleware, then bounded execution, then durable
//! per-thread state.

use std::sync::Arc;
use std::time::Duration;

use relaycore_chain::middlewares::{CircuitBreakerMiddleware, CircuitOpenError, LoggingMiddleware, TimingMiddleware};
use relaycore_chain::{Chain, Middleware, Request, Response};
use relaycore_checkpoint::{DistributedCheckpointer, DistributedCheckpointerConfig, InMemoryCheckpointer};
use relaycore_pool::{Pool, PoolConfig, PoolOutcome};
use relaycore_ratelimit::{FixedWindowBackend, RateLimiterBackend};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn rejected_clients_never_reach_the_chain() {
    let limiter = FixedWindowBackend::new(2, Duration::from_secs(60));

    let handled = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let handled_clone = Arc::clone(&handled);
    let chain: Chain<u32, u32, (), CircuitOpenError> = Chain::new("lifecycle", move |req| {
        let handled = Arc::clone(&handled_clone);
        Box::pin(async move {
            handled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Response::new(req.input.unwrap_or(0) * 2))
        })
    });
    chain.r#use([
        Arc::new(LoggingMiddleware::new("log")) as Arc<dyn Middleware<u32, u32, (), CircuitOpenError>>,
        Arc::new(TimingMiddleware::new("timing")) as Arc<dyn Middleware<u32, u32, (), CircuitOpenError>>,
    ]);

    let ctx = CancellationToken::new();
    let mut admitted = 0;
    let mut rejected = 0;
    for i in 0..5u32 {
        if limiter.allow("tenant-a").await.unwrap() {
            admitted += 1;
            let _ = chain.execute(&ctx, Request::new(i)).await;
        } else {
            rejected += 1;
        }
    }

    assert_eq!(admitted, 2);
    assert_eq!(rejected, 3);
    assert_eq!(
        handled.load(std::sync::atomic::Ordering::SeqCst),
        2,
        "only admitted requests should reach the handler"
    );
}

#[tokio::test]
async fn pool_submitted_handler_result_is_checkpointed() {
    let pool = Pool::new(PoolConfig::builder().name("checkpoint-pool").capacity(4).build().unwrap());
    let primary = InMemoryCheckpointer::<String>::new();
    let secondary = InMemoryCheckpointer::<String>::new();
    let checkpointer = DistributedCheckpointer::new(primary, Some(secondary), DistributedCheckpointerConfig::default());
    let ctx = CancellationToken::new();

    let outcome = pool
        .submit(async { "turn-1-result".to_string() })
        .await
        .unwrap()
        .await;

    let PoolOutcome::Completed(result) = outcome else {
        panic!("expected the handler to complete");
    };

    checkpointer.save(&ctx, "conversation-1", result.clone()).await.unwrap();
    assert_eq!(checkpointer.load(&ctx, "conversation-1").await.unwrap(), result);
}

#[tokio::test]
async fn circuit_breaker_short_circuits_after_the_chain_sees_repeated_handler_errors() {
    let chain: Chain<(), (), (), CircuitOpenError> = Chain::new("panics", |_req| {
        Box::pin(async { Err(CircuitOpenError) })
    });
    let breaker = Arc::new(CircuitBreakerMiddleware::new("breaker", 2, Duration::from_secs(60)));
    chain.r#use([breaker.clone() as Arc<dyn Middleware<(), (), (), CircuitOpenError>>]);

    let ctx = CancellationToken::new();
    for _ in 0..2 {
        assert!(chain.execute(&ctx, Request::new(())).await.is_err());
    }

    let result = chain.execute(&ctx, Request::new(())).await;
    assert!(result.is_err(), "breaker should now short-circuit before the handler runs");
}
