//! Per-request timing, recorded under a unique key with an exposed running average.

use crate::metadata::keys;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Stamps `before` with a start instant and records, on `after`, the elapsed
/// duration (preferring [`Response::duration`] when the handler already set
/// it, falling back to the stamped start) into a running average.
pub struct TimingMiddleware {
    name: String,
    total_nanos: AtomicU64,
    count: AtomicU64,
    recent: Mutex<Vec<(String, Duration)>>,
}

impl TimingMiddleware {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_nanos: AtomicU64::new(0),
            count: AtomicU64::new(0),
            recent: Mutex::new(Vec::new()),
        }
    }

    /// Mean duration across every recorded `after` call so far.
    pub fn average_latency(&self) -> Duration {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed) / count)
    }

    fn record(&self, key: String, duration: Duration) {
        self.total_nanos.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.recent.lock().expect("timing recent mutex poisoned").push((key, duration));
    }
}

#[async_trait]
impl<In, Out, St, E> Middleware<In, Out, St, E> for TimingMiddleware
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
        req.metadata.insert(keys::TIMING_START, Instant::now());
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, mut resp: Response<Out, St>) -> Result<Response<Out, St>, E> {
        let duration = if resp.duration > Duration::ZERO {
            resp.duration
        } else if let Some(start) = resp.metadata.get::<Instant>(keys::TIMING_START) {
            start.elapsed()
        } else {
            Duration::ZERO
        };
        let key = format!("{}-{}", self.name, self.count.load(Ordering::Relaxed));
        resp.metadata.insert(keys::TIMING_DURATION, duration);
        self.record(key, duration);
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AppError;

    #[tokio::test]
    async fn records_average_across_calls() {
        let mw = TimingMiddleware::new("timing");
        let ctx = CancellationToken::new();

        for millis in [10u64, 20u64] {
            let mut resp: Response<u32, ()> = Response::new(1);
            resp.duration = Duration::from_millis(millis);
            Middleware::<u32, u32, (), AppError>::after(&mw, &ctx, resp).await.unwrap();
        }

        assert_eq!(mw.average_latency(), Duration::from_millis(15));
    }
}
