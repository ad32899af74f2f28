//! Property tests for the quantified rate-limiter admission invariants.
//!
//! - Fixed window: the number of successful `allow(k)` in any window is
//!   `<= limit` exactly.
//! - Sliding window: the number of successful `allow(k)` in any window is
//!   `<= limit + 1` (one tolerance slot for the non-atomic prune/count/add
//!   pipeline under contention).

use proptest::prelude::*;
use relaycore_ratelimit::{
    FixedWindowBackend, InMemorySortedSetStore, RateLimiterBackend, SlidingWindowBackend,
};
use std::sync::Arc;
use std::time::Duration;

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fixed_window_admits_at_most_limit_within_a_window(limit in 1usize..10, attempts in 1usize..40) {
        rt().block_on(async {
            let backend = FixedWindowBackend::new(limit, Duration::from_secs(3600));
            let mut admitted = 0usize;
            for _ in 0..attempts {
                if backend.allow("k").await.unwrap() {
                    admitted += 1;
                }
            }
            prop_assert!(admitted <= limit);
            Ok(())
        })?;
    }

    #[test]
    fn sliding_window_admits_at_most_limit_plus_one(limit in 1usize..10, attempts in 1usize..40) {
        rt().block_on(async {
            let store = Arc::new(InMemorySortedSetStore::new());
            let backend = Arc::new(SlidingWindowBackend::new(store, limit, Duration::from_secs(3600)));
            let mut admitted = 0usize;
            for _ in 0..attempts {
                if backend.allow("k").await.unwrap() {
                    admitted += 1;
                }
            }
            prop_assert!(admitted <= limit + 1);
            Ok(())
        })?;
    }

    #[test]
    fn reset_always_restores_full_admission(limit in 1usize..6) {
        rt().block_on(async {
            let backend = FixedWindowBackend::new(limit, Duration::from_secs(3600));
            for _ in 0..limit {
                prop_assert!(backend.allow("k").await.unwrap());
            }
            prop_assert!(!backend.allow("k").await.unwrap());
            backend.reset("k").await.unwrap();
            prop_assert!(backend.allow("k").await.unwrap());
            Ok(())
        })?;
    }
}
