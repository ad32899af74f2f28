//! Example demonstrating the interceptor chain protecting a flaky handler
//! with a circuit breaker middleware.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use relaycore_chain::middlewares::{CircuitBreakerMiddleware, CircuitOpenError};
use relaycore_chain::{Chain, Middleware, Request, Response};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let call_count = Arc::new(AtomicUsize::new(0));
    let cc = Arc::clone(&call_count);

    // Fails two calls out of every three.
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

    let breaker = Arc::new(CircuitBreakerMiddleware::new(
        "demo-breaker",
        2,
        Duration::from_millis(200),
    ));
    chain.r#use([breaker.clone() as Arc<dyn Middleware<(), (), (), CircuitOpenError>>]);

    println!("Sending 15 requests through a chain with a circuit breaker:");
    let ctx = CancellationToken::new();
    for i in 1..=15 {
        match chain.execute(&ctx, Request::new(())).await {
            Ok(_) => println!("  Request {i}: Success"),
            Err(e) => println!("  Request {i}: Failed ({e})"),
        }
    }

    println!(
        "\n  Total handler invocations: {}",
        call_count.load(Ordering::SeqCst)
    );
    println!("  Circuit breaker state: {:?}", breaker.state());
}
