//! Chain-attachable circuit breaker: consecutive-failure-count threshold
//! rather than the rate-based sliding window `tower-resilience-circuitbreaker`
//! uses, since a chain middleware sees one request at a time and has no
//! notion of a call-rate window to slide.

use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_circuit_breaker_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "chain_circuit_breaker_calls_rejected_total",
            "Calls rejected by a chain circuit-breaker middleware while open"
        );
        describe_counter!(
            "chain_circuit_breaker_transitions_total",
            "State transitions made by a chain circuit-breaker middleware"
        );
        describe_gauge!(
            "chain_circuit_breaker_state",
            "Current state of a chain circuit-breaker middleware (0=closed, 1=open, 2=half-open)"
        );
    });
}

/// Circuit breaker state, stored atomically so `before` never blocks on the
/// state transition lock for the common closed-and-healthy case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Rejects calls once consecutive failures cross `failure_threshold`, until
/// `recovery_timeout` elapses, then admits exactly one half-open probe.
pub struct CircuitBreakerMiddleware {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreakerMiddleware {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        #[cfg(feature = "metrics")]
        describe_circuit_breaker_metrics();
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, state: CircuitState) {
        self.state.store(state as u8, Ordering::Release);
        if state == CircuitState::Open {
            *self.opened_at.lock().expect("circuit opened_at mutex poisoned") = Some(Instant::now());
        }
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("chain_circuit_breaker_transitions_total", "breaker" => self.name.clone())
                .increment(1);
            metrics::gauge!("chain_circuit_breaker_state", "breaker" => self.name.clone())
                .set(state as u8 as f64);
        }
    }

    fn record_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => self.transition(CircuitState::Open),
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.failure_threshold {
                    self.transition(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_success(&self) {
        if self.state() == CircuitState::HalfOpen {
            self.consecutive_failures.store(0, Ordering::Release);
            self.transition(CircuitState::Closed);
        }
    }
}

/// Error returned by the circuit breaker's `before` hook when the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenError;

#[async_trait]
impl<In, Out, St> Middleware<In, Out, St, CircuitOpenError> for CircuitBreakerMiddleware
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _ctx: &CancellationToken, req: Request<In, St>) -> Result<Request<In, St>, CircuitOpenError> {
        if self.state() == CircuitState::Open {
            let elapsed = self
                .opened_at
                .lock()
                .expect("circuit opened_at mutex poisoned")
                .map(|at| at.elapsed())
                .unwrap_or(Duration::ZERO);
            if elapsed >= self.recovery_timeout {
                self.transition(CircuitState::HalfOpen);
            } else {
                #[cfg(feature = "metrics")]
                metrics::counter!("chain_circuit_breaker_calls_rejected_total", "breaker" => self.name.clone())
                    .increment(1);
                return Err(CircuitOpenError);
            }
        }
        Ok(req)
    }

    async fn after(&self, _ctx: &CancellationToken, resp: Response<Out, St>) -> Result<Response<Out, St>, CircuitOpenError> {
        if resp.is_error() {
            self.record_failure();
        } else {
            self.record_success();
        }
        Ok(resp)
    }

    async fn on_error(&self, _ctx: &CancellationToken, err: CircuitOpenError) -> Result<(), CircuitOpenError> {
        self.record_failure();
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let mw = CircuitBreakerMiddleware::new("cb", 2, Duration::from_secs(60));
        let ctx = CancellationToken::new();

        let _ = Middleware::<u32, u32, (), CircuitOpenError>::on_error(&mw, &ctx, CircuitOpenError).await;
        assert_eq!(mw.state(), CircuitState::Closed);
        let _ = Middleware::<u32, u32, (), CircuitOpenError>::on_error(&mw, &ctx, CircuitOpenError).await;
        assert_eq!(mw.state(), CircuitState::Open);

        let result = Middleware::<u32, u32, (), CircuitOpenError>::before(&mw, &ctx, Request::new(1u32)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn half_open_probe_closes_on_success() {
        let mw = CircuitBreakerMiddleware::new("cb", 1, Duration::from_millis(0));
        let ctx = CancellationToken::new();
        let _ = Middleware::<u32, u32, (), CircuitOpenError>::on_error(&mw, &ctx, CircuitOpenError).await;
        assert_eq!(mw.state(), CircuitState::Open);

        let req = Middleware::<u32, u32, (), CircuitOpenError>::before(&mw, &ctx, Request::new(1u32))
            .await
            .unwrap();
        assert_eq!(mw.state(), CircuitState::HalfOpen);
        let _ = req;

        let resp = Response::new(1u32);
        Middleware::<u32, u32, (), CircuitOpenError>::after(&mw, &ctx, resp).await.unwrap();
        assert_eq!(mw.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_probe_reopens_on_failure() {
        let mw = CircuitBreakerMiddleware::new("cb", 1, Duration::from_millis(0));
        let ctx = CancellationToken::new();
        let _ = Middleware::<u32, u32, (), CircuitOpenError>::on_error(&mw, &ctx, CircuitOpenError).await;
        let _ = Middleware::<u32, u32, (), CircuitOpenError>::before(&mw, &ctx, Request::new(1u32)).await;
        assert_eq!(mw.state(), CircuitState::HalfOpen);

        let mut resp: Response<u32, ()> = Response::new(1u32);
        resp.error = Some("boom".to_string());
        Middleware::<u32, u32, (), CircuitOpenError>::after(&mw, &ctx, resp).await.unwrap();
        assert_eq!(mw.state(), CircuitState::Open);
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn opening_the_circuit_records_a_transition_and_rejects_with_a_counted_metric() {
        use metrics::set_global_recorder;
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};
        use std::sync::LazyLock;

        static RECORDER: LazyLock<DebuggingRecorder> = LazyLock::new(DebuggingRecorder::default);
        let _ = set_global_recorder(&*RECORDER);

        let mw = CircuitBreakerMiddleware::new("metrics-cb", 1, Duration::from_secs(60));
        let ctx = CancellationToken::new();
        let _ = Middleware::<u32, u32, (), CircuitOpenError>::on_error(&mw, &ctx, CircuitOpenError).await;
        assert_eq!(mw.state(), CircuitState::Open);

        let result = Middleware::<u32, u32, (), CircuitOpenError>::before(&mw, &ctx, Request::new(1u32)).await;
        assert!(result.is_err());

        let snapshot = RECORDER.snapshotter().snapshot().into_vec();
        let rejected = snapshot.iter().find(|(key, _, _, _)| {
            key.key().name() == "chain_circuit_breaker_calls_rejected_total"
                && key
                    .key()
                    .labels()
                    .any(|label| label.key() == "breaker" && label.value() == "metrics-cb")
        });
        let (_, _, _, value) = rejected.expect("expected a rejected-calls counter");
        assert!(matches!(value, DebugValue::Counter(n) if *n >= 1));
    }
}
