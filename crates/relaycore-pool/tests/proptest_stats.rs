//! Property test for the pool's core statistics invariant: at quiescence,
//! `submitted == completed + failed + rejected` for any mix of successful
//! and panicking tasks pushed through a bounded-capacity pool.

use proptest::prelude::*;
use relaycore_pool::{Pool, PoolConfig};
use std::sync::Arc;
use std::time::Duration;

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn stats_reconcile_after_quiescence(
        capacity in 1usize..8,
        should_panic in prop::collection::vec(any::<bool>(), 1..30),
    ) {
        rt().block_on(async move {
            let config = PoolConfig::builder()
                .name("proptest-pool")
                .capacity(capacity)
                .build()
                .unwrap();
            let pool = Pool::new(config);

            let mut handles = Vec::new();
            for panics in should_panic.iter().copied() {
                match pool.submit(async move {
                    if panics {
                        panic!("proptest induced panic");
                    }
                    1u32
                }).await {
                    Ok(task) => handles.push(task),
                    Err(_) => { /* rejected at admission, already counted */ }
                }
            }
            for handle in handles {
                let _ = handle.await;
            }

            let snapshot = pool.stats();
            prop_assert!(snapshot.is_consistent());
            prop_assert_eq!(snapshot.submitted, should_panic.len() as u64);
            Ok(())
        })?;
    }

    #[test]
    fn every_panic_increments_panics_recovered_and_failed(count in 1usize..20) {
        rt().block_on(async move {
            let config = PoolConfig::builder()
                .name("proptest-panic-pool")
                .capacity(4)
                .build()
                .unwrap();
            let pool = Pool::new(config);

            let mut handles = Vec::new();
            for _ in 0..count {
                handles.push(pool.submit(async { panic!("boom") }).await.unwrap());
            }
            for handle in handles {
                let _ = handle.await;
            }

            let snapshot = pool.stats();
            prop_assert_eq!(snapshot.panics_recovered, count as u64);
            prop_assert_eq!(snapshot.failed, count as u64);
            prop_assert!(snapshot.is_consistent());
            Ok(())
        })?;
    }
}
