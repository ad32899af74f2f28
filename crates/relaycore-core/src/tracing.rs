//! The tracing provider surface consumed (not owned) by the interceptor
//! chain and other cross-cutting code: span lifecycle, exporter/sampler
//! composition, and text-map carriers for header-based context propagation.
//!
//! This module intentionally stops short of a full OpenTelemetry SDK
//! integration — it defines the shape every subsystem needs (construct a
//! provider from options, get a named tracer, start/annotate/end spans,
//! inject/extract via headers) and backs it with the `tracing` +
//! `tracing-subscriber` crates already used for structured logging
//! elsewhere in the workspace. Wiring an actual OTLP exporter is left to
//! the embedding service; [`ExporterKind::OtlpGrpc`] and
//! [`ExporterKind::OtlpHttp`] are accepted as configuration but render
//! through the same `tracing`-backed provider as `Stdout`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::Level;

/// Where spans are ultimately sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterKind {
    /// OTLP over gRPC. Accepted for configuration compatibility; rendered
    /// through the same `tracing`-backed pipeline as [`Self::Stdout`].
    OtlpGrpc,
    /// OTLP over HTTP. Same caveat as [`Self::OtlpGrpc`].
    OtlpHttp,
    /// Human-readable spans on stdout via `tracing-subscriber`'s fmt layer.
    Stdout,
    /// Spans are constructed but never exported.
    Noop,
}

/// Decides which spans are recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerKind {
    /// Every span is recorded.
    AlwaysOn,
    /// No span is recorded.
    AlwaysOff,
    /// A span is recorded with probability `ratio`, independent of any
    /// parent sampling decision. `ratio` is clamped to `[0.0, 1.0]`.
    Ratio(f64),
    /// If a parent span exists, its sampling decision is inherited;
    /// otherwise falls back to [`Self::Ratio`] with the given ratio.
    ParentBased(f64),
}

impl SamplerKind {
    fn ratio(self) -> f64 {
        match self {
            SamplerKind::AlwaysOn => 1.0,
            SamplerKind::AlwaysOff => 0.0,
            SamplerKind::Ratio(r) | SamplerKind::ParentBased(r) => r.clamp(0.0, 1.0),
        }
    }

    /// Whether a new span should be recorded, given whether a parent span is
    /// currently in scope.
    fn should_sample(self, has_parent: bool) -> bool {
        match self {
            SamplerKind::AlwaysOn => true,
            SamplerKind::AlwaysOff => false,
            SamplerKind::Ratio(r) => sample_ratio(r),
            SamplerKind::ParentBased(r) => has_parent || sample_ratio(r),
        }
    }
}

/// Cheap pseudo-random admission test, avoiding a `rand` dependency for a
/// single probabilistic comparison. Not cryptographic; callers needing
/// uniform sampling guarantees should prefer `AlwaysOn`/`AlwaysOff`.
fn sample_ratio(ratio: f64) -> bool {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio >= 1.0 {
        return true;
    }
    if ratio <= 0.0 {
        return false;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) < ratio
}

/// Batch-export tuning, mirrored after the OpenTelemetry SDK's batch span
/// processor knobs without depending on it.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Maximum number of spans buffered before the oldest are dropped.
    pub max_queue_size: usize,
    /// How often buffered spans are flushed to the exporter.
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

/// Service identity attached to every span a provider emits.
#[derive(Debug, Clone)]
pub struct ServiceMetadata {
    pub name: String,
    pub version: Option<String>,
}

impl ServiceMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Options used to [`build`] a [`TracingProvider`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub enabled: bool,
    pub service: ServiceMetadata,
    pub exporter: ExporterKind,
    pub sampler: SamplerKind,
    pub batch: BatchConfig,
}

impl ProviderOptions {
    pub fn new(service: ServiceMetadata) -> Self {
        Self {
            enabled: true,
            service,
            exporter: ExporterKind::Stdout,
            sampler: SamplerKind::AlwaysOn,
            batch: BatchConfig::default(),
        }
    }

    pub fn disabled(service: ServiceMetadata) -> Self {
        Self {
            enabled: false,
            ..Self::new(service)
        }
    }

    pub fn with_exporter(mut self, exporter: ExporterKind) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Builds the provider described by these options. Disabled options
    /// always produce a [`NoopProvider`] regardless of `exporter`.
    pub fn build(self) -> Box<dyn TracingProvider> {
        if !self.enabled || matches!(self.exporter, ExporterKind::Noop) {
            Box::new(NoopProvider::new())
        } else {
            Box::new(TracingSubscriberProvider::new(self))
        }
    }
}

/// Errors a provider's lifecycle operations can return.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing provider shut down")]
    ShutDown,
    #[error("tracing exporter error: {0}")]
    Exporter(String),
}

/// A span in flight. Wraps a `tracing::Span`; when the provider is
/// disabled or the span was not sampled, wraps `None` and every operation
/// is a true no-op.
pub struct Span {
    inner: Option<tracing::Span>,
}

impl Span {
    fn recording(span: tracing::Span) -> Self {
        Self { inner: Some(span) }
    }

    fn noop() -> Self {
        Self { inner: None }
    }

    /// Whether this span is actually being recorded (sampled in, provider
    /// enabled). Useful to skip expensive attribute computation.
    pub fn is_recording(&self) -> bool {
        self.inner.is_some()
    }

    /// Attaches a string attribute. A no-op on an unsampled/disabled span.
    pub fn set_attribute(&self, key: &'static str, value: impl fmt::Display) {
        if let Some(span) = &self.inner {
            let _entered = span.enter();
            tracing::trace!(target: "relaycore::tracing", attribute.key = key, attribute.value = %value, "span attribute");
        }
    }

    /// Records an error on the span: sets an error status and logs the
    /// error's display form as an event, matching the spec's "record-error
    /// sets error status" requirement.
    pub fn record_error(&self, err: &(dyn std::error::Error + 'static)) {
        if let Some(span) = &self.inner {
            let _entered = span.enter();
            tracing::event!(Level::ERROR, error = %err, "span error");
        }
    }

    /// Adds a named event with no attributes to the span's timeline.
    pub fn add_event(&self, name: &str) {
        if let Some(span) = &self.inner {
            let _entered = span.enter();
            tracing::event!(Level::INFO, event.name = name, "span event");
        }
    }

    /// Ends the span. Spans also end implicitly on drop; this exists so
    /// callers can end a span explicitly at a meaningful point without
    /// fighting the borrow checker over drop order.
    pub fn end(self) {
        drop(self);
    }

    /// The span's `tracing` id, usable to correlate log lines with this
    /// span. `None` if the provider is disabled or the span wasn't
    /// sampled.
    pub fn id(&self) -> Option<u64> {
        self.inner.as_ref().and_then(|s| s.id()).map(|id| id.into_u64())
    }
}

/// A named source of spans, obtained from a [`TracingProvider`].
pub trait Tracer: Send + Sync {
    /// Starts a new span with the given operation name.
    fn start_span(&self, name: &str) -> Span;
}

/// Constructs and owns the lifecycle of tracers/spans for a service.
pub trait TracingProvider: Send + Sync {
    /// Returns a tracer scoped to `name` (typically a module or
    /// subsystem), used as an instrumentation-library identifier.
    fn tracer(&self, name: &str) -> Box<dyn Tracer>;

    /// Forces any buffered spans to be exported immediately.
    fn force_flush(&self) -> Result<(), TracingError>;

    /// Flushes and releases the provider's resources. Idempotent.
    fn shutdown(&self) -> Result<(), TracingError>;

    /// Whether this provider actually records anything.
    fn is_enabled(&self) -> bool;
}

/// A provider where every operation is a true no-op: no spans are
/// allocated, no attributes are recorded, flush/shutdown always succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProvider;

impl NoopProvider {
    pub fn new() -> Self {
        Self
    }
}

struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_span(&self, _name: &str) -> Span {
        Span::noop()
    }
}

impl TracingProvider for NoopProvider {
    fn tracer(&self, _name: &str) -> Box<dyn Tracer> {
        Box::new(NoopTracer)
    }

    fn force_flush(&self) -> Result<(), TracingError> {
        Ok(())
    }

    fn shutdown(&self) -> Result<(), TracingError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// A provider backed by the ambient `tracing` subscriber. Span creation
/// goes through a single fixed-name `tracing::span!` call site (span
/// metadata names must be `'static`) carrying the caller's dynamic name as
/// the `otel.name` field, the same convention `tracing-opentelemetry`
/// bridges use for dynamic span naming.
pub struct TracingSubscriberProvider {
    service: ServiceMetadata,
    sampler: SamplerKind,
    shutdown: std::sync::atomic::AtomicBool,
}

impl TracingSubscriberProvider {
    pub fn new(options: ProviderOptions) -> Self {
        Self {
            service: options.service,
            sampler: options.sampler,
            shutdown: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

struct SubscriberTracer {
    service_name: String,
    instrumentation_name: String,
    sampler: SamplerKind,
}

impl Tracer for SubscriberTracer {
    fn start_span(&self, name: &str) -> Span {
        let has_parent = !tracing::Span::current().is_disabled();
        if !self.sampler.should_sample(has_parent) {
            return Span::noop();
        }
        let span = tracing::span!(
            Level::INFO,
            "relaycore_span",
            otel.name = %name,
            service.name = %self.service_name,
            instrumentation.name = %self.instrumentation_name,
        );
        Span::recording(span)
    }
}

impl TracingProvider for TracingSubscriberProvider {
    fn tracer(&self, name: &str) -> Box<dyn Tracer> {
        Box::new(SubscriberTracer {
            service_name: self.service.name.clone(),
            instrumentation_name: name.to_string(),
            sampler: self.sampler,
        })
    }

    fn force_flush(&self) -> Result<(), TracingError> {
        if self.shutdown.load(std::sync::atomic::Ordering::Acquire) {
            return Err(TracingError::ShutDown);
        }
        // `tracing`'s subscriber is responsible for its own buffering; a
        // fmt/stdout layer writes synchronously, so there is nothing to
        // flush here beyond giving the embedding subscriber a hook point.
        Ok(())
    }

    fn shutdown(&self) -> Result<(), TracingError> {
        self.shutdown.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        !self.shutdown.load(std::sync::atomic::Ordering::Acquire)
    }
}

/// Abstracts header-bag get/set/keys so trace context can be
/// injected/extracted without the chain depending on a concrete header
/// type.
pub trait TextMapCarrier {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: String, value: String);
    fn keys(&self) -> Vec<String>;
}

impl TextMapCarrier for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(|s| s.as_str())
    }

    fn set(&mut self, key: String, value: String) {
        self.insert(key, value);
    }

    fn keys(&self) -> Vec<String> {
        HashMap::keys(self).cloned().collect()
    }
}

/// The traceparent header key conventionally used for W3C trace context
/// propagation, exposed so carriers agree on a single well-known key.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// Builds a W3C-shaped `traceparent` value from a span, for injection into
/// an outbound carrier. Uses the span's `tracing` id (not a real 128-bit
/// OTel trace id, since this provider doesn't own a trace id allocator)
/// zero-padded into the trace-id slot, which is sufficient for
/// same-process correlation but not cross-process OTel interop.
pub fn inject_traceparent(span: &Span, carrier: &mut dyn TextMapCarrier) {
    if let Some(id) = span.id() {
        let value = format!("00-{:032x}-{:016x}-01", id, id);
        carrier.set(TRACEPARENT_KEY.to_string(), value);
    }
}

/// Extracts a previously injected span id from a carrier's `traceparent`
/// header, for logging correlation. Returns `None` if the header is
/// absent or malformed.
pub fn extract_span_id(carrier: &dyn TextMapCarrier) -> Option<u64> {
    let value = carrier.get(TRACEPARENT_KEY)?;
    let mut parts = value.split('-');
    let _version = parts.next()?;
    let _trace_id = parts.next()?;
    let span_id = parts.next()?;
    u64::from_str_radix(span_id, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_options_build_a_noop_provider() {
        let provider = ProviderOptions::disabled(ServiceMetadata::new("svc")).build();
        assert!(!provider.is_enabled());
        let tracer = provider.tracer("component");
        let span = tracer.start_span("op");
        assert!(!span.is_recording());
        assert!(provider.force_flush().is_ok());
        assert!(provider.shutdown().is_ok());
    }

    #[test]
    fn noop_exporter_kind_forces_noop_even_when_enabled() {
        let options = ProviderOptions::new(ServiceMetadata::new("svc")).with_exporter(ExporterKind::Noop);
        let provider = options.build();
        assert!(!provider.is_enabled());
    }

    #[test]
    fn always_on_sampler_always_records() {
        let options =
            ProviderOptions::new(ServiceMetadata::new("svc")).with_sampler(SamplerKind::AlwaysOn);
        let provider = options.build();
        let tracer = provider.tracer("component");
        let span = tracer.start_span("op");
        assert!(span.is_recording());
    }

    #[test]
    fn always_off_sampler_never_records() {
        let options =
            ProviderOptions::new(ServiceMetadata::new("svc")).with_sampler(SamplerKind::AlwaysOff);
        let provider = options.build();
        let tracer = provider.tracer("component");
        let span = tracer.start_span("op");
        assert!(!span.is_recording());
    }

    #[test]
    fn shutdown_is_idempotent_and_blocks_further_flush() {
        let provider = ProviderOptions::new(ServiceMetadata::new("svc")).build();
        assert!(provider.shutdown().is_ok());
        assert!(provider.shutdown().is_ok());
        assert!(provider.force_flush().is_err());
    }

    #[test]
    fn text_map_carrier_roundtrips_on_hashmap() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        TextMapCarrier::set(&mut carrier, "x-request-id".to_string(), "abc".to_string());
        assert_eq!(TextMapCarrier::get(&carrier, "x-request-id"), Some("abc"));
        assert!(TextMapCarrier::keys(&carrier).contains(&"x-request-id".to_string()));
    }

    #[test]
    fn inject_then_extract_roundtrips_span_id() {
        let options =
            ProviderOptions::new(ServiceMetadata::new("svc")).with_sampler(SamplerKind::AlwaysOn);
        let provider = options.build();
        let tracer = provider.tracer("component");
        let span = tracer.start_span("op");
        let mut carrier: HashMap<String, String> = HashMap::new();
        inject_traceparent(&span, &mut carrier);
        assert_eq!(extract_span_id(&carrier), span.id());
    }

    #[test]
    fn extract_span_id_is_none_for_missing_header() {
        let carrier: HashMap<String, String> = HashMap::new();
        assert_eq!(extract_span_id(&carrier), None);
    }
}
