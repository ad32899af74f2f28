//! Validates requests before they reach the handler.

use crate::metadata::keys;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a caller-supplied predicate over the request, rejecting with `E`
/// when it fails and otherwise stamping `metadata.validated = true`.
pub struct Validator<In, St, E> {
    name: String,
    check: Arc<dyn Fn(&Request<In, St>) -> Result<(), E> + Send + Sync>,
}

impl<In, St, E> Validator<In, St, E> {
    pub fn new(name: impl Into<String>, check: impl Fn(&Request<In, St>) -> Result<(), E> + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, E> for Validator<In, St, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _ctx: &CancellationToken, mut req: Request<In, St>) -> Result<Request<In, St>, E> {
        (self.check)(&req)?;
        req.metadata.insert(keys::VALIDATED, true);
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, resp: Response<Out, St>) -> Result<Response<Out, St>, E> {
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AppError(&'static str);

    #[tokio::test]
    async fn rejects_requests_failing_the_predicate() {
        let mw: Validator<u32, (), AppError> = Validator::new("validate", |req| {
            if req.input == Some(0) {
                Err(AppError("zero not allowed"))
            } else {
                Ok(())
            }
        });
        let ctx = CancellationToken::new();

        let good = Middleware::<u32, u32, (), AppError>::before(&mw, &ctx, Request::new(5u32)).await.unwrap();
        assert_eq!(good.metadata.get::<bool>(keys::VALIDATED), Some(&true));

        let bad = Middleware::<u32, u32, (), AppError>::before(&mw, &ctx, Request::new(0u32)).await;
        assert!(bad.is_err());
    }
}
