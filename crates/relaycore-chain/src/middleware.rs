//! The `before`/`after`/`on_error` hook contract every chain participant implements.

use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A single before/handler/after participant in a [`crate::Chain`].
///
/// Mirrors the external chain-middleware contract's `name`/`before`/`after`/
/// `on_error` quartet. Every hook has a pass-through default so a concrete
/// middleware only needs to override the hooks it actually cares about —
/// the reference cache and circuit-breaker crates each implement
/// a single `tower::Layer`/`Service` pair; this generalizes that to four
/// independent, individually overridable hooks.
#[async_trait]
pub trait Middleware<In, Out, St, E>: Send + Sync
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + 'static,
    E: Send + 'static,
{
    /// A stable, human-readable name used in events, logs, and `onError`
    /// attribution.
    fn name(&self) -> &str;

    /// Runs before the handler (or a short-circuiting cache hit). Returning
    /// `Err` routes the error to this same middleware's [`Middleware::on_error`].
    async fn before(&self, _ctx: &CancellationToken, req: Request<In, St>) -> Result<Request<In, St>, E> {
        Ok(req)
    }

    /// Runs after the handler, in reverse registration order. Returning
    /// `Err` routes the error to this same middleware's [`Middleware::on_error`].
    async fn after(&self, _ctx: &CancellationToken, resp: Response<Out, St>) -> Result<Response<Out, St>, E> {
        Ok(resp)
    }

    /// Reacts to an error from this middleware's own hook, or (for handler
    /// errors) from the terminal handler, consulted in forward registration
    /// order. `Ok(())` suppresses the error entirely; `Err(e)` substitutes,
    /// wraps, or simply rethrows it as the error that continues propagating.
    ///
    /// The default neither wraps nor suppresses: it rethrows `err` verbatim.
    async fn on_error(&self, _ctx: &CancellationToken, err: E) -> Result<(), E> {
        Err(err)
    }
}
