//! Process-wide named-pool registry.

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::pool::Pool;
use crate::stats::PoolStatsSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// A process-wide, name-keyed table of pools.
///
/// Mirrors the `Once`-guarded metrics-description pattern used elsewhere in this codebase
/// (`tower-resilience-bulkhead::layer::METRICS_INIT`): the map itself is
/// guarded by a `Mutex`, with a `OnceLock` ensuring the map is allocated
/// exactly once no matter how many callers race to use the registry first.
pub struct PoolRegistry {
    pools: Mutex<HashMap<String, Arc<Pool>>>,
}

static REGISTRY: OnceLock<PoolRegistry> = OnceLock::new();

impl PoolRegistry {
    fn global() -> &'static PoolRegistry {
        REGISTRY.get_or_init(|| PoolRegistry {
            pools: Mutex::new(HashMap::new()),
        })
    }

    /// Registers a new pool under `config.name`. Errors if that name is
    /// already taken.
    pub fn register(config: PoolConfig) -> Result<Arc<Pool>> {
        let name = config.name.clone();
        let registry = Self::global();
        let mut pools = registry.pools.lock().expect("pool registry mutex poisoned");
        if pools.contains_key(&name) {
            return Err(PoolError::AlreadyExists { name });
        }
        let pool = Pool::new(config);
        pools.insert(name, Arc::clone(&pool));
        Ok(pool)
    }

    /// Returns the pool registered under `name`, if any.
    pub fn get(name: &str) -> Option<Arc<Pool>> {
        let registry = Self::global();
        let pools = registry.pools.lock().expect("pool registry mutex poisoned");
        pools.get(name).cloned()
    }

    /// Returns the names of every registered pool.
    pub fn list() -> Vec<String> {
        let registry = Self::global();
        let pools = registry.pools.lock().expect("pool registry mutex poisoned");
        pools.keys().cloned().collect()
    }

    /// Aggregates the stats of every registered pool, keyed by name.
    pub fn stats() -> HashMap<String, PoolStatsSnapshot> {
        let registry = Self::global();
        let pools = registry.pools.lock().expect("pool registry mutex poisoned");
        pools
            .iter()
            .map(|(name, pool)| (name.clone(), pool.stats()))
            .collect()
    }

    /// Releases a single named pool (idempotent; no-op if not found).
    pub fn release(name: &str) -> Result<()> {
        let registry = Self::global();
        let pools = registry.pools.lock().expect("pool registry mutex poisoned");
        match pools.get(name) {
            Some(pool) => {
                pool.release();
                Ok(())
            }
            None => Err(PoolError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Releases every registered pool. `release` itself is infallible, so
    /// this always succeeds; the `Result` return mirrors
    /// `release_all_with_timeout` for a uniform registry-wide shutdown API.
    pub fn release_all() -> Result<()> {
        let registry = Self::global();
        let pools = registry.pools.lock().expect("pool registry mutex poisoned");
        for pool in pools.values() {
            pool.release();
        }
        Ok(())
    }

    /// Releases every registered pool, waiting up to `timeout` per pool for
    /// in-flight tasks to drain, continuing past errors and returning the
    /// first one encountered.
    pub async fn release_all_with_timeout(timeout: Duration) -> Result<()> {
        let snapshot: Vec<Arc<Pool>> = {
            let registry = Self::global();
            let pools = registry.pools.lock().expect("pool registry mutex poisoned");
            pools.values().cloned().collect()
        };
        let mut first_error = None;
        for pool in snapshot {
            if let Err(e) = pool.release_with_timeout(timeout).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Removes a released pool from the registry entirely, allowing a fresh
    /// pool to be registered under the same name. No-op if the pool is not
    /// closed or not found.
    pub fn forget(name: &str) -> Option<Arc<Pool>> {
        let registry = Self::global();
        let mut pools = registry.pools.lock().expect("pool registry mutex poisoned");
        match pools.get(name) {
            Some(pool) if pool.is_closed() => pools.remove(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn unique_name(prefix: &str) -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[tokio::test]
    async fn register_get_and_release() {
        let name = unique_name("registry-test");
        let config = PoolConfig::builder()
            .name(name.clone())
            .capacity(4)
            .build()
            .unwrap();
        let pool = PoolRegistry::register(config).unwrap();
        assert!(PoolRegistry::get(&name).is_some());
        assert!(PoolRegistry::list().contains(&name));

        let outcome = pool.submit(async { 7 }).await.unwrap().await;
        assert!(matches!(outcome, crate::pool::PoolOutcome::Completed(7)));

        PoolRegistry::release(&name).unwrap();
        assert!(PoolRegistry::get(&name).unwrap().is_closed());

        let forgotten = PoolRegistry::forget(&name);
        assert!(forgotten.is_some());
        assert!(PoolRegistry::get(&name).is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_errors() {
        let name = unique_name("registry-dup");
        let config = PoolConfig::builder().name(name.clone()).build().unwrap();
        let _pool = PoolRegistry::register(config).unwrap();
        let config2 = PoolConfig::builder().name(name.clone()).build().unwrap();
        assert!(matches!(
            PoolRegistry::register(config2),
            Err(PoolError::AlreadyExists { .. })
        ));
        PoolRegistry::release(&name).unwrap();
        PoolRegistry::forget(&name);
    }

    #[test]
    fn release_missing_pool_errors() {
        assert!(matches!(
            PoolRegistry::release("does-not-exist-xyz"),
            Err(PoolError::NotFound { .. })
        ));
    }
}
