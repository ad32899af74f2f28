//! Chain-attachable rate limiting, composing the standalone
//! [`relaycore_ratelimit`] crate's backends rather than re-implementing
//! window logic at this layer.

use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use relaycore_ratelimit::{ClientIpExtractor, RateLimiterBackend};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reserved metadata key a caller may set to carry the immediate TCP peer
/// address through to the rate limiter's IP-fallback key derivation.
pub const PEER_ADDR: &str = "peer_addr";

/// Reserved metadata/state key the rate limiter checks before falling back
/// to client IP.
pub const USER_ID: &str = "user_id";

/// Error returned when the attached backend rejects a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitedError;

/// Derives the per-request subject key: `state`-supplied user id, then
/// `metadata["user_id"]`, then client IP (honoring trusted-proxy forwarding
/// headers if the request carries a [`PEER_ADDR`] metadata entry).
pub struct RateLimiterMiddleware<In, St> {
    name: String,
    backend: Arc<dyn RateLimiterBackend>,
    ip_extractor: ClientIpExtractor,
    state_user_id: Arc<dyn Fn(&St) -> Option<String> + Send + Sync>,
    on_exceeded: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    _marker: std::marker::PhantomData<fn(In)>,
}

impl<In, St> RateLimiterMiddleware<In, St> {
    /// Builds a rate limiter with no state-derived user id (metadata and IP
    /// fallback only).
    pub fn new(name: impl Into<String>, backend: Arc<dyn RateLimiterBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            ip_extractor: ClientIpExtractor::untrusted(),
            state_user_id: Arc::new(|_| None),
            on_exceeded: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Supplies a function extracting a user id directly from request state,
    /// checked before metadata and IP.
    pub fn with_state_user_id(mut self, f: impl Fn(&St) -> Option<String> + Send + Sync + 'static) -> Self {
        self.state_user_id = Arc::new(f);
        self
    }

    /// Trusts `proxies` (CIDR ranges) to supply `X-Forwarded-For`/`X-Real-IP`.
    pub fn with_trusted_proxies(mut self, extractor: ClientIpExtractor) -> Self {
        self.ip_extractor = extractor;
        self
    }

    /// Registers a callback invoked with the subject key whenever the
    /// backend rejects a request, before `before()` returns
    /// [`RateLimitedError`]. Useful for metrics/logging without needing a
    /// separate middleware layered in front of this one.
    pub fn with_on_exceeded(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_exceeded = Some(Arc::new(f));
        self
    }

    fn subject_key(&self, req: &Request<In, St>) -> String {
        if let Some(user_id) = (self.state_user_id)(&req.state) {
            return user_id;
        }
        if let Some(user_id) = req.metadata.get::<String>(USER_ID) {
            return user_id.clone();
        }
        let peer = req
            .metadata
            .get::<IpAddr>(PEER_ADDR)
            .copied()
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        self.ip_extractor.extract(peer, &req.headers).to_string()
    }
}

#[async_trait]
impl<In, Out, St> Middleware<In, Out, St, RateLimitedError> for RateLimiterMiddleware<In, St>
where
    In: Send + 'static,
    Out: Send + 'static,
    St: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _ctx: &CancellationToken, req: Request<In, St>) -> Result<Request<In, St>, RateLimitedError> {
        let key = self.subject_key(&req);
        match self.backend.allow(&key).await {
            Ok(true) => Ok(req),
            Ok(false) => {
                if let Some(on_exceeded) = &self.on_exceeded {
                    on_exceeded(&key);
                }
                Err(RateLimitedError)
            }
            Err(_) => Ok(req),
        }
    }
}
