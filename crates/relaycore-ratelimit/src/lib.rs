//! Per-key rate limiting.
//!
//! Two backends share the [`RateLimiterBackend`] contract:
//!
//! - [`FixedWindowBackend`] — in-process, sharded per-key fixed windows,
//!   suitable for a single instance.
//! - [`SlidingWindowBackend`] — built against a [`SortedSetStore`], suitable
//!   for a fleet of instances sharing state through a common store.
//!
//! ```
//! use relaycore_ratelimit::FixedWindowBackend;
//! use relaycore_ratelimit::RateLimiterBackend;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = FixedWindowBackend::new(100, Duration::from_secs(60));
//! if limiter.allow("client-42").await.unwrap() {
//!     // admit the request
//! }
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod fixed_window;
pub mod net;
pub mod sliding_window;
pub mod sorted_set;

pub use backend::RateLimiterBackend;
pub use error::{RateLimiterError, Result};
pub use fixed_window::{FixedWindowBackend, SweeperHandle};
pub use net::{ClientIpExtractor, PathMatcher};
pub use sliding_window::SlidingWindowBackend;
pub use sorted_set::{now_nanos, InMemorySortedSetStore, SortedSetStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn both_backends_implement_the_same_contract() {
        let fixed = FixedWindowBackend::new(1, Duration::from_secs(5));
        let sliding = Arc::new(SlidingWindowBackend::new(
            Arc::new(InMemorySortedSetStore::new()),
            1,
            Duration::from_secs(5),
        ));

        async fn exercise(limiter: &dyn RateLimiterBackend) {
            assert!(limiter.allow("shared-key").await.unwrap());
            assert!(!limiter.allow("shared-key").await.unwrap());
            limiter.reset("shared-key").await.unwrap();
            assert!(limiter.allow("shared-key").await.unwrap());
        }

        exercise(fixed.as_ref()).await;
        exercise(sliding.as_ref()).await;
    }
}
