//! Mutates request input (and/or response output) in transit, stamping
//! `metadata.modified_by` with its own name.

use crate::metadata::keys;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Applies a caller-supplied transform to the request input and, optionally,
/// the response output.
pub struct Transformer<In, Out> {
    name: String,
    transform_input: Arc<dyn Fn(In) -> In + Send + Sync>,
    transform_output: Arc<dyn Fn(Out) -> Out + Send + Sync>,
}

impl<In, Out> Transformer<In, Out> {
    /// Builds a transformer touching only the request input; the response
    /// output passes through unchanged.
    pub fn new(name: impl Into<String>, transform_input: impl Fn(In) -> In + Send + Sync + 'static) -> Self
    where
        Out: Send + 'static,
    {
        Self {
            name: name.into(),
            transform_input: Arc::new(transform_input),
            transform_output: Arc::new(|out| out),
        }
    }

    /// Additionally transforms the response output.
    pub fn with_output_transform(mut self, transform_output: impl Fn(Out) -> Out + Send + Sync + 'static) -> Self {
        self.transform_output = Arc::new(transform_output);
        self
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, E> for Transformer<In, Out>
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
        if let Some(input) = req.input.take() {
            req.input = Some((self.transform_input)(input));
        }
        req.metadata.insert(keys::MODIFIED_BY, self.name.clone());
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, mut resp: Response<Out, St>) -> Result<Response<Out, St>, E> {
        if let Some(output) = resp.output.take() {
            resp.output = Some((self.transform_output)(output));
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AppError;

    #[tokio::test]
    async fn transforms_input_and_stamps_modified_by() {
        let mw: Transformer<u32, u32> = Transformer::new("double", |n| n * 2);
        let ctx = CancellationToken::new();
        let req = Middleware::<u32, u32, (), AppError>::before(&mw, &ctx, Request::new(5u32)).await.unwrap();
        assert_eq!(req.input, Some(10));
        assert_eq!(req.metadata.get::<String>(crate::metadata::keys::MODIFIED_BY), Some(&"double".to_string()));
    }

    #[tokio::test]
    async fn output_transform_is_opt_in() {
        let mw: Transformer<u32, u32> = Transformer::new("double", |n| n * 2).with_output_transform(|n| n + 1);
        let ctx = CancellationToken::new();
        let resp = Middleware::<u32, u32, (), AppError>::after(&mw, &ctx, Response::new(10u32)).await.unwrap();
        assert_eq!(resp.output, Some(11));
    }
}
