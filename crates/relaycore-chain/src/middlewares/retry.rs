//! Advisory retry marking: flags errors a configurable predicate accepts as
//! retryable, leaving the actual re-execution to the invoker.

use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An error wrapped with a retry recommendation.
#[derive(Debug, Clone)]
pub struct RetryableError<E> {
    /// The original error.
    pub source: E,
    /// `true` if the configured predicate judged this error worth retrying.
    pub retry_needed: bool,
}

/// Marks handler errors as retryable or not, per a caller-supplied predicate.
/// Does not itself re-invoke the chain: the decision to retry, and the retry
/// loop, belong to whatever code called [`crate::Chain::execute`].
pub struct RetryMiddleware<E> {
    name: String,
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> RetryMiddleware<E> {
    /// Builds a retry-advisory middleware using `predicate` to decide which
    /// errors are retryable.
    pub fn new(name: impl Into<String>, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, RetryableError<E>> for RetryMiddleware<E>
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _ctx: &CancellationToken, req: Request<In, St>) -> Result<Request<In, St>, RetryableError<E>> {
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, resp: Response<Out, St>) -> Result<Response<Out, St>, RetryableError<E>> {
        Ok(resp)
    }

    async fn on_error(&self, _ctx: &CancellationToken, err: RetryableError<E>) -> Result<(), RetryableError<E>> {
        let retry_needed = (self.predicate)(&err.source);
        Err(RetryableError { retry_needed, ..err })
    }
}
