//! Configuration for a [`crate::Pool`], including the five reserved presets.

use crate::events::PoolEvent;
use crate::executor::Executor;
use relaycore_core::events::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Receives panics recovered from submitted tasks.
///
/// The default implementation logs via `tracing` (when the `tracing`
/// feature is enabled) and is otherwise a no-op; callers wanting to page
/// an on-call rotation or bump a metric supply their own.
pub trait PanicHandler: Send + Sync + 'static {
    /// Called once per recovered panic, after stats have been updated.
    fn handle(&self, pool_name: &str, message: &str);
}

/// [`PanicHandler`] that logs via `tracing::error!` when the `tracing`
/// feature is enabled, and is a no-op otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPanicHandler;

impl PanicHandler for LoggingPanicHandler {
    fn handle(&self, pool_name: &str, message: &str) {
        #[cfg(feature = "tracing")]
        tracing::error!(pool = pool_name, panic_message = %message, "pool task panicked");
        #[cfg(not(feature = "tracing"))]
        {
            let _ = (pool_name, message);
        }
    }
}

/// Immutable configuration a [`crate::Pool`] is built from.
#[derive(Clone)]
pub struct PoolConfig {
    pub(crate) name: String,
    pub(crate) capacity: usize,
    pub(crate) blocking: bool,
    pub(crate) max_waiting: Option<usize>,
    pub(crate) idle_expiry: Option<Duration>,
    pub(crate) preallocate: bool,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) panic_handler: Arc<dyn PanicHandler>,
    pub(crate) event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfig {
    /// Starts a builder with the library defaults (same as the `default` preset).
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Reserved preset: general-purpose pool. Capacity 1000, 10s idle expiry, blocking.
    pub fn default_preset() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
            .name("default")
            .capacity(1000)
            .idle_expiry(Some(Duration::from_secs(10)))
            .blocking(true)
    }

    /// Reserved preset: health-check pool. Capacity 100, preallocated, nonblocking, queue 10.
    pub fn health_check_preset() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
            .name("health-check")
            .capacity(100)
            .preallocate(true)
            .blocking(false)
            .max_waiting(Some(10))
    }

    /// Reserved preset: background-task pool. Capacity 50, 60s idle expiry, nonblocking, queue 100.
    pub fn background_preset() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
            .name("background")
            .capacity(50)
            .idle_expiry(Some(Duration::from_secs(60)))
            .blocking(false)
            .max_waiting(Some(100))
    }

    /// Reserved preset: callback-dispatch pool. Capacity 200, blocking, queue (max parked) 1000.
    pub fn callback_preset() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
            .name("callback")
            .capacity(200)
            .blocking(true)
            .max_waiting(Some(1000))
    }

    /// Reserved preset: timeout-bound pool. Capacity 5000, preallocated, nonblocking, queue 1000.
    pub fn timeout_preset() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
            .name("timeout")
            .capacity(5000)
            .preallocate(true)
            .blocking(false)
            .max_waiting(Some(1000))
    }
}

/// Builder for [`PoolConfig`].
pub struct PoolConfigBuilder {
    name: String,
    capacity: usize,
    blocking: bool,
    max_waiting: Option<usize>,
    idle_expiry: Option<Duration>,
    preallocate: bool,
    executor: Option<Arc<dyn Executor>>,
    panic_handler: Arc<dyn PanicHandler>,
    event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfigBuilder {
    /// Creates a new builder with library defaults: capacity 1000, blocking, no queue cap.
    pub fn new() -> Self {
        Self {
            name: "pool".to_string(),
            capacity: 1000,
            blocking: true,
            max_waiting: None,
            idle_expiry: None,
            preallocate: false,
            executor: None,
            panic_handler: Arc::new(LoggingPanicHandler),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the pool's name, used for registry lookup and observability labels.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of concurrently-running tasks.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// `true`: submitters park until a permit is free (subject to `max_waiting`).
    /// `false`: submissions past capacity are queued up to `max_waiting`, then rejected.
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Bounds the number of parked submitters (blocking pools) or queued tasks
    /// (nonblocking pools). `None` means unbounded waiting.
    pub fn max_waiting(mut self, max_waiting: Option<usize>) -> Self {
        self.max_waiting = max_waiting;
        self
    }

    /// How long an unused permit may sit idle before the reaper logs it.
    /// Observability only; does not affect admission.
    pub fn idle_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.idle_expiry = expiry;
        self
    }

    /// Marks this pool as preallocated (metadata only, consumed by callers
    /// that distinguish warm vs. lazily-sized pools).
    pub fn preallocate(mut self, preallocate: bool) -> Self {
        self.preallocate = preallocate;
        self
    }

    /// Overrides the executor tasks are spawned on (default: the current tokio runtime).
    pub fn executor(mut self, executor: impl Executor) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Overrides the panic handler invoked for recovered panics.
    pub fn panic_handler(mut self, handler: impl PanicHandler) -> Self {
        self.panic_handler = Arc::new(handler);
        self
    }

    /// Registers a callback invoked whenever a task is admitted.
    pub fn on_task_submitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::TaskSubmitted { running, .. } = event {
                f(*running);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a task is rejected.
    pub fn on_task_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::TaskRejected { capacity, .. } = event {
                f(*capacity);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a task finishes (success or failure).
    pub fn on_task_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::TaskCompleted {
                duration, succeeded, ..
            } = event
            {
                f(*duration, *succeeded);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a submitted task panics.
    pub fn on_task_panicked<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::TaskPanicked { message, .. } = event {
                f(message);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    ///
    /// Fails if `capacity == 0`, or if `idle_expiry` is `Some(Duration::ZERO)`.
    pub fn build(self) -> crate::error::Result<PoolConfig> {
        if self.capacity == 0 {
            return Err(crate::error::PoolError::InvalidConfig {
                detail: "capacity must be greater than zero".to_string(),
            });
        }
        if self.idle_expiry == Some(Duration::ZERO) {
            return Err(crate::error::PoolError::InvalidConfig {
                detail: "idle_expiry must be greater than zero".to_string(),
            });
        }
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(tokio::runtime::Handle::current()));
        Ok(PoolConfig {
            name: self.name,
            capacity: self.capacity,
            blocking: self.blocking,
            max_waiting: self.max_waiting,
            idle_expiry: self.idle_expiry,
            preallocate: self.preallocate,
            executor,
            panic_handler: self.panic_handler,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
