//! The shared contract both rate-limiter backends implement.

use crate::error::Result;
use async_trait::async_trait;

/// A per-key rate-limiting backend.
///
/// Mirrors the external interface's `allow(ctx, key) -> (bool, err)` /
/// `reset(ctx, key) -> err` contract rather than a
/// single-instance `SharedRateLimiter`, which has no notion of a per-request
/// key. Both the in-process fixed-window backend and the distributed
/// sliding-window backend implement this trait identically from a caller's
/// perspective.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Returns `Ok(true)` if `key` is currently permitted to proceed,
    /// `Ok(false)` if it has exceeded its limit. Backend I/O errors are
    /// returned as `Err`; callers should fail open (admit) on `Err`.
    async fn allow(&self, key: &str) -> Result<bool>;

    /// Removes any tracked state for `key`, as if it had never made a call.
    async fn reset(&self, key: &str) -> Result<()>;
}
