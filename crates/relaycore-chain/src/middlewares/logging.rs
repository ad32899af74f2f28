//! Request/response logging, custom logger defaults to stdout.

use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sink a [`LoggingMiddleware`] writes through.
pub trait Logger: Send + Sync {
    fn log(&self, line: &str);
}

/// Default logger: writes to stdout, same fallback the pool crate's
/// [`relaycore_pool::LoggingPanicHandler`] uses when the `tracing` feature
/// is off.
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, line: &str) {
        #[cfg(feature = "tracing")]
        tracing::info!("{line}");
        #[cfg(not(feature = "tracing"))]
        println!("{line}");
    }
}

/// Logs input/metadata before the handler runs, output/duration after, and
/// rethrows on error after logging it.
pub struct LoggingMiddleware {
    name: String,
    logger: Arc<dyn Logger>,
}

impl LoggingMiddleware {
    /// Builds a logging middleware writing to stdout (or `tracing`, if the
    /// `tracing` feature is enabled).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logger: Arc::new(StdoutLogger),
        }
    }

    /// Builds a logging middleware writing through a custom [`Logger`].
    pub fn with_logger(name: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self { name: name.into(), logger }
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, E> for LoggingMiddleware
where
    In: Debug + Send + 'static,
    Out: Debug + Send + 'static,
    St: Send + 'static,
    E: Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _ctx: &CancellationToken, req: Request<In, St>) -> Result<Request<In, St>, E> {
        self.logger.log(&format!(
            "request input={:?} metadata_len={}",
            req.input,
            req.metadata.len()
        ));
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, resp: Response<Out, St>) -> Result<Response<Out, St>, E> {
        self.logger.log(&format!(
            "response output={:?} duration={:?}",
            resp.output, resp.duration
        ));
        Ok(resp)
    }

    async fn on_error(&self, _ctx: &CancellationToken, err: E) -> Result<(), E> {
        self.logger.log(&format!("error={err:?}"));
        Err(err)
    }
}
