//! Property test: for any non-short-circuited execution, the number of
//! `before` calls equals the number of `after` calls, regardless of how
//! many middlewares are registered.

use async_trait::async_trait;
use proptest::prelude::*;
use relaycore_chain::{Chain, Middleware, Request, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
struct AppError(&'static str);

struct CountingMiddleware {
    before_count: Arc<AtomicUsize>,
    after_count: Arc<AtomicUsize>,
}

#[async_trait]
impl Middleware<&'static str, &'static str, (), AppError> for CountingMiddleware {
    fn name(&self) -> &str {
        "counting"
    }

    async fn before(
        &self,
        _ctx: &CancellationToken,
        req: Request<&'static str, ()>,
    ) -> Result<Request<&'static str, ()>, AppError> {
        self.before_count.fetch_add(1, Ordering::SeqCst);
        Ok(req)
    }

    async fn after(
        &self,
        _ctx: &CancellationToken,
        resp: Response<&'static str, ()>,
    ) -> Result<Response<&'static str, ()>, AppError> {
        self.after_count.fetch_add(1, Ordering::SeqCst);
        Ok(resp)
    }
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn before_and_after_counts_match_for_any_middleware_count(n in 0usize..12) {
        rt().block_on(async move {
            let chain: Chain<&'static str, &'static str, (), AppError> =
                Chain::new("proptest-chain", |req| {
                    Box::pin(async move { Ok(Response::new(req.input.unwrap_or("default"))) })
                });

            let mut before_counters = Vec::new();
            let mut after_counters = Vec::new();
            for _ in 0..n {
                let before_count = Arc::new(AtomicUsize::new(0));
                let after_count = Arc::new(AtomicUsize::new(0));
                chain.r#use([Arc::new(CountingMiddleware {
                    before_count: before_count.clone(),
                    after_count: after_count.clone(),
                }) as Arc<dyn Middleware<_, _, _, _>>]);
                before_counters.push(before_count);
                after_counters.push(after_count);
            }

            let ctx = CancellationToken::new();
            let resp = chain.execute(&ctx, Request::new("x")).await.unwrap();
            prop_assert_eq!(resp.output, Some("x"));

            let total_before: usize = before_counters.iter().map(|c| c.load(Ordering::SeqCst)).sum();
            let total_after: usize = after_counters.iter().map(|c| c.load(Ordering::SeqCst)).sum();
            prop_assert_eq!(total_before, n);
            prop_assert_eq!(total_after, n);
            prop_assert_eq!(total_before, total_after);
            Ok(())
        })?;
    }
}
