//! A named, multi-instance worker-pool manager.
//!
//! Generalizes a single-layer bulkhead (`tokio::sync::Semaphore`
//! concurrency limiting) and executor (`Executor` trait over
//! `tokio::runtime::Handle::spawn`) into a standalone, named pool that is not
//! tied to a single `tower::Service`. Every submitted task runs under a
//! panic-recovery guard, is tracked by lock-free atomic [`PoolStats`], and
//! can be submitted with or without a cooperative-cancellation
//! [`tokio_util::sync::CancellationToken`].
//!
//! # Example
//!
//! ```rust
//! use relaycore_pool::{Pool, PoolConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pool = Pool::new(PoolConfig::builder().name("demo").capacity(10).build().unwrap());
//! let outcome = pool.submit(async { 1 + 1 }).await.unwrap().await;
//! assert!(matches!(outcome, relaycore_pool::PoolOutcome::Completed(2)));
//! # }
//! ```
//!
//! # Registry and presets
//!
//! ```rust
//! use relaycore_pool::{PoolConfig, PoolRegistry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = PoolConfig::background_preset().name("reports-bg").build().unwrap();
//! let pool = PoolRegistry::register(config).unwrap();
//! pool.submit(async { /* periodic housekeeping */ }).await.unwrap();
//! # PoolRegistry::release("reports-bg").unwrap();
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod pool;
pub mod registry;
pub mod stats;

pub use config::{LoggingPanicHandler, PanicHandler, PoolConfig, PoolConfigBuilder};
pub use error::{PoolError, Result};
pub use events::PoolEvent;
pub use executor::Executor;
pub use pool::{Pool, PoolOutcome, PoolTask};
pub use registry::PoolRegistry;
pub use stats::{PoolStats, PoolStatsSnapshot};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preset_capacities_match_spec() {
        assert_eq!(
            PoolConfig::default_preset().build().unwrap().capacity,
            1000
        );
        assert_eq!(
            PoolConfig::health_check_preset().build().unwrap().capacity,
            100
        );
        assert_eq!(
            PoolConfig::background_preset().build().unwrap().capacity,
            50
        );
        assert_eq!(PoolConfig::callback_preset().build().unwrap().capacity, 200);
        assert_eq!(PoolConfig::timeout_preset().build().unwrap().capacity, 5000);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = PoolConfig::builder().capacity(0).build();
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_idle_expiry_is_rejected() {
        let result = PoolConfig::builder()
            .idle_expiry(Some(std::time::Duration::ZERO))
            .build();
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
    }

    #[test]
    fn absent_idle_expiry_is_accepted() {
        let result = PoolConfig::builder().idle_expiry(None).build();
        assert!(result.is_ok());
    }
}
