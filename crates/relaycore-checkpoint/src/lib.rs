//! Per-thread state checkpointing with an optional distributed,
//! failover-aware wrapper.
//!
//! [`CheckpointBackend`] is the pluggable storage contract: `save`,
//! `load`, `list`, `delete`, `exists`, plus an optional `ping` health probe.
//! [`InMemoryCheckpointer`] implements it directly; [`AutoCleanupCheckpointer`]
//! wraps any backend with a background age-based purge; and
//! [`DistributedCheckpointer`] composes a primary and optional secondary
//! backend with sync/async replication, automatic failover, and delayed
//! failback.
//!
//! ```
//! use relaycore_checkpoint::{CheckpointBackend, InMemoryCheckpointer};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = InMemoryCheckpointer::<String>::new();
//! let ctx = CancellationToken::new();
//! store.save(&ctx, "thread-1", "state-v1".to_string()).await.unwrap();
//! assert_eq!(store.load(&ctx, "thread-1").await.unwrap(), "state-v1");
//! # }
//! ```

pub mod backend;
pub mod cleanup;
pub mod config;
pub mod distributed;
pub mod error;
pub mod memory;

pub use backend::{CheckpointBackend, CheckpointInfo};
pub use cleanup::{AutoCleanupCheckpointer, SweeperHandle};
pub use config::{DistributedCheckpointerConfig, DistributedCheckpointerConfigBuilder, ReplicationMode};
pub use distributed::{ActiveBackend, DistributedCheckpointer, DistributedCheckpointerStatus};
pub use error::{CheckpointError, Result};
pub use memory::{CheckpointEntry, InMemoryCheckpointer};
