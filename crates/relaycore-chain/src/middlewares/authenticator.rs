//! Authenticates requests before they reach the handler.

use crate::metadata::keys;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a caller-supplied credential check, rejecting with `E` on failure
/// and otherwise stamping `metadata.authenticated = true`.
pub struct Authenticator<In, St, E> {
    name: String,
    authenticate: Arc<dyn Fn(&Request<In, St>) -> Result<(), E> + Send + Sync>,
}

impl<In, St, E> Authenticator<In, St, E> {
    pub fn new(name: impl Into<String>, authenticate: impl Fn(&Request<In, St>) -> Result<(), E> + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            authenticate: Arc::new(authenticate),
        }
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, E> for Authenticator<In, St, E>
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
        (self.authenticate)(&req)?;
        req.metadata.insert(keys::AUTHENTICATED, true);
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
    struct AuthError;

    #[tokio::test]
    async fn stamps_authenticated_on_success() {
        let mw: Authenticator<u32, (), AuthError> = Authenticator::new("auth", |req| {
            if req.headers.contains_key("authorization") {
                Ok(())
            } else {
                Err(AuthError)
            }
        });
        let ctx = CancellationToken::new();

        let mut req: Request<u32, ()> = Request::new(1);
        req.headers.insert("authorization".to_string(), "Bearer x".to_string());
        let req = Middleware::<u32, u32, (), AuthError>::before(&mw, &ctx, req).await.unwrap();
        assert_eq!(req.metadata.get::<bool>(keys::AUTHENTICATED), Some(&true));

        let missing = Middleware::<u32, u32, (), AuthError>::before(&mw, &ctx, Request::new(2u32)).await;
        assert!(missing.is_err());
    }
}
