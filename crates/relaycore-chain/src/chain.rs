//! The interceptor chain itself: an ordered before/handler/after pipeline
//! with a lock-free hot-path read of its middleware sequence.

use crate::error::ChainError;
use crate::events::ChainEvent;
use crate::metadata::keys;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use arc_swap::ArcSwap;
use futures::future::BoxFuture;
use relaycore_core::events::EventListeners;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The terminal async handler a [`Chain`] wraps.
///
/// A plain boxed closure rather than a trait object behind `async_trait`:
/// handlers are supplied once at construction and never need dynamic
/// dispatch beyond the single `Fn` call, so this avoids an extra trait for
/// no benefit, the same way the pool crate's [`relaycore_pool::Executor`]
/// stays a plain trait instead of an `async_trait`.
pub type HandlerFn<In, Out, St, E> =
    dyn Fn(Request<In, St>) -> BoxFuture<'static, Result<Response<Out, St>, E>> + Send + Sync;

/// An ordered before/handler/after pipeline.
///
/// The middleware sequence is stored behind an [`ArcSwap`] — the idiomatic
/// Rust analogue of "an atomic pointer to an immutable slice": readers call
/// [`ArcSwap::load`] and never block, while [`Chain::r#use`] copy-on-writes
/// a fresh `Vec` under a dedicated `write_mutex` so concurrent callers to
/// `use` serialize with each other without ever blocking a reader.
pub struct Chain<In, Out, St, E> {
    name: String,
    middlewares: ArcSwap<Vec<Arc<dyn Middleware<In, Out, St, E>>>>,
    write_mutex: Mutex<()>,
    handler: Arc<HandlerFn<In, Out, St, E>>,
    events: EventListeners<ChainEvent>,
}

impl<In, Out, St, E> Chain<In, Out, St, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + Default + 'static,
    E: Send + 'static,
{
    /// Builds a chain with no middleware and the given terminal handler.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request<In, St>) -> BoxFuture<'static, Result<Response<Out, St>, E>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            middlewares: ArcSwap::from_pointee(Vec::new()),
            write_mutex: Mutex::new(()),
            handler: Arc::new(handler),
            events: EventListeners::new(),
        }
    }

    /// Registers a listener for chain-lifecycle events (see [`ChainEvent`]).
    pub fn on_event<L>(&mut self, listener: L)
    where
        L: relaycore_core::events::EventListener<ChainEvent> + 'static,
    {
        self.events.add(listener);
    }

    /// Appends `middlewares` to the chain. Copy-on-write: readers already
    /// mid-execution keep seeing the sequence as of their `load`, never a
    /// partially-updated one.
    pub fn r#use(&self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware<In, Out, St, E>>>) {
        let _guard = self.write_mutex.lock().expect("chain write mutex poisoned");
        let mut next = (**self.middlewares.load()).clone();
        next.extend(middlewares);
        self.middlewares.store(Arc::new(next));
    }

    /// Number of middlewares currently registered.
    pub fn size(&self) -> usize {
        self.middlewares.load().len()
    }

    fn emit(&self, event: ChainEvent) {
        self.events.emit(&event);
    }

    /// Runs `req` through the full before/handler/after protocol.
    ///
    /// See the module-level execution protocol: before-hooks run in
    /// registration order; a before-hook failure consults only that
    /// middleware's `on_error`; a cached response short-circuits the
    /// handler with zero duration; a handler failure consults every
    /// middleware's `on_error` in forward order; after-hooks run in
    /// reverse, each failure again consulting only that middleware's
    /// `on_error`.
    pub async fn execute(&self, ctx: &CancellationToken, req: Request<In, St>) -> Result<Response<Out, St>, ChainError<E>> {
        let start = Instant::now();
        let middlewares = self.middlewares.load_full();

        let mut current_req = Some(req);
        // Tracks how many middlewares, counting from the front, actually had
        // `before()` invoked on them (whether it succeeded or errored). The
        // after-loop below must only run over this prefix: a middleware
        // whose `before()` never ran (because an earlier one's error was
        // suppressed and the loop broke) must not see an `after()` call
        // either, or the before/after invocation counts diverge.
        let mut before_invoked = 0usize;
        for (idx, mw) in middlewares.iter().enumerate() {
            let taken = current_req.take().expect("request consumed twice in before phase");
            match mw.before(ctx, taken).await {
                Ok(r) => {
                    current_req = Some(r);
                    before_invoked = idx + 1;
                    self.emit(ChainEvent::BeforeRan {
                        chain_name: self.name.clone(),
                        middleware: mw.name().to_string(),
                        timestamp: Instant::now(),
                    });
                }
                Err(e) => match mw.on_error(ctx, e).await {
                    Ok(()) => {
                        // Suppressed: the request is now gone, so no further
                        // before-hooks run and the handler is bypassed. This
                        // middleware's before() was still invoked, so it
                        // still counts toward the after-loop's prefix.
                        before_invoked = idx + 1;
                        current_req = None;
                        break;
                    }
                    Err(e2) => {
                        self.emit(ChainEvent::Aborted {
                            chain_name: self.name.clone(),
                            middleware: mw.name().to_string(),
                            timestamp: Instant::now(),
                        });
                        return Err(ChainError::MiddlewareAborted {
                            middleware: mw.name().to_string(),
                            source: Box::new(ChainError::Handler(e2)),
                        });
                    }
                },
            }
        }

        let mut response = match current_req {
            None => {
                // A before-hook failure was suppressed: synthesize an empty
                // response; duration is elapsed time, not zero (only a
                // cache short-circuit gets zero duration).
                let mut resp: Response<Out, St> = Response::default();
                resp.duration = start.elapsed();
                resp
            }
            Some(mut req) => {
                if let Some(mut cached) = req.metadata.remove::<Response<Out, St>>(keys::CACHED_RESPONSE) {
                    cached.duration = std::time::Duration::ZERO;
                    // Carries forward whatever the before-hooks stamped onto
                    // the request (e.g. `CACHE_HIT`) — the cached response
                    // itself comes back with blank metadata.
                    cached.metadata.merge_missing(std::mem::take(&mut req.metadata));
                    self.emit(ChainEvent::CacheHit {
                        chain_name: self.name.clone(),
                        timestamp: Instant::now(),
                    });
                    cached
                } else {
                    // Snapshotted before the handler consumes `req` by value,
                    // so a before-hook's metadata survives into the response
                    // even though the handler builds one from scratch.
                    let carried_metadata = std::mem::take(&mut req.metadata);
                    match (self.handler)(req).await {
                        Ok(mut resp) => {
                            resp.duration = start.elapsed();
                            resp.metadata.merge_missing(carried_metadata);
                            resp
                        }
                        Err(e) => {
                            let mut current_err = e;
                            let mut suppressed = false;
                            for mw in middlewares.iter() {
                                match mw.on_error(ctx, current_err).await {
                                    Ok(()) => {
                                        suppressed = true;
                                        break;
                                    }
                                    Err(next) => current_err = next,
                                }
                            }
                            if suppressed {
                                let mut resp: Response<Out, St> = Response::default();
                                resp.duration = start.elapsed();
                                resp.metadata.merge_missing(carried_metadata);
                                resp
                            } else {
                                self.emit(ChainEvent::Aborted {
                                    chain_name: self.name.clone(),
                                    middleware: "handler".to_string(),
                                    timestamp: Instant::now(),
                                });
                                return Err(ChainError::Handler(current_err));
                            }
                        }
                    }
                }
            }
        };

        for mw in middlewares[..before_invoked].iter().rev() {
            let taken = response;
            match mw.after(ctx, taken).await {
                Ok(r) => {
                    response = r;
                    self.emit(ChainEvent::AfterRan {
                        chain_name: self.name.clone(),
                        middleware: mw.name().to_string(),
                        timestamp: Instant::now(),
                    });
                }
                Err(e) => match mw.on_error(ctx, e).await {
                    Ok(()) => {
                        // Suppressed: keep whatever the previous after-hook
                        // (or the handler) last produced and continue.
                        response = Response::default();
                        response.duration = start.elapsed();
                    }
                    Err(e2) => {
                        self.emit(ChainEvent::Aborted {
                            chain_name: self.name.clone(),
                            middleware: mw.name().to_string(),
                            timestamp: Instant::now(),
                        });
                        return Err(ChainError::MiddlewareAborted {
                            middleware: mw.name().to_string(),
                            source: Box::new(ChainError::Handler(e2)),
                        });
                    }
                },
            }
        }

        self.emit(ChainEvent::ExecutionCompleted {
            chain_name: self.name.clone(),
            timestamp: Instant::now(),
            duration: response.duration,
            succeeded: !response.is_error(),
        });

        Ok(response)
    }
}
