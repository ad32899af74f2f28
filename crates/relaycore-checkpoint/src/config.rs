//! Configuration for [`crate::distributed::DistributedCheckpointer`].

use std::time::Duration;

/// How a save/delete against the primary is mirrored to the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Replicate inline, as part of the operation. A replication failure is
    /// logged but never fails the primary operation.
    Sync,
    /// Enqueue onto a bounded channel drained by a worker pool. A full queue
    /// drops that operation's replication; it is counted, never escalated.
    Async,
}

/// Tunables for [`crate::distributed::DistributedCheckpointer`].
#[derive(Debug, Clone)]
pub struct DistributedCheckpointerConfig {
    /// How replication to the secondary is performed.
    pub replication_mode: ReplicationMode,
    /// Number of worker tasks draining the replication queue in [`ReplicationMode::Async`].
    pub async_worker_count: usize,
    /// Capacity of the bounded replication channel in [`ReplicationMode::Async`].
    pub queue_capacity: usize,
    /// Whether an operation error against the active backend may trigger failover.
    pub auto_failover: bool,
    /// Hard ceiling on the number of failovers this instance will perform,
    /// preventing oscillation between a flapping primary and secondary.
    pub max_failover_attempts: u32,
    /// Interval between primary/secondary health probes.
    pub health_check_interval: Duration,
    /// Minimum time that must elapse after a failover before a failback
    /// back to a healthy primary is considered.
    pub failback_delay: Duration,
}

impl Default for DistributedCheckpointerConfig {
    fn default() -> Self {
        Self {
            replication_mode: ReplicationMode::Sync,
            async_worker_count: 3,
            queue_capacity: 1000,
            auto_failover: true,
            max_failover_attempts: 3,
            health_check_interval: Duration::from_secs(30),
            failback_delay: Duration::from_secs(60),
        }
    }
}

impl DistributedCheckpointerConfig {
    /// Creates a new builder seeded with the defaults above.
    pub fn builder() -> DistributedCheckpointerConfigBuilder {
        DistributedCheckpointerConfigBuilder::default()
    }
}

/// Builder for [`DistributedCheckpointerConfig`].
#[derive(Debug, Clone, Default)]
pub struct DistributedCheckpointerConfigBuilder {
    config: Option<DistributedCheckpointerConfig>,
}

impl DistributedCheckpointerConfigBuilder {
    fn config_mut(&mut self) -> &mut DistributedCheckpointerConfig {
        self.config.get_or_insert_with(DistributedCheckpointerConfig::default)
    }

    /// Sets the replication mode. Default: [`ReplicationMode::Sync`].
    pub fn replication_mode(mut self, mode: ReplicationMode) -> Self {
        self.config_mut().replication_mode = mode;
        self
    }

    /// Sets the async replication worker count. Default: 3.
    pub fn async_worker_count(mut self, count: usize) -> Self {
        self.config_mut().async_worker_count = count.max(1);
        self
    }

    /// Sets the bounded replication queue capacity. Default: 1000.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config_mut().queue_capacity = capacity.max(1);
        self
    }

    /// Enables or disables automatic failover on active-backend errors. Default: enabled.
    pub fn auto_failover(mut self, enabled: bool) -> Self {
        self.config_mut().auto_failover = enabled;
        self
    }

    /// Sets the hard ceiling on failover attempts. Default: 3.
    pub fn max_failover_attempts(mut self, attempts: u32) -> Self {
        self.config_mut().max_failover_attempts = attempts;
        self
    }

    /// Sets the health-probe interval. Default: 30s.
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.config_mut().health_check_interval = interval;
        self
    }

    /// Sets the minimum delay before a failback is attempted. Default: 60s.
    pub fn failback_delay(mut self, delay: Duration) -> Self {
        self.config_mut().failback_delay = delay;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> DistributedCheckpointerConfig {
        self.config.unwrap_or_default()
    }
}
