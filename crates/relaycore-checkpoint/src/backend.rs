//! The shared contract every checkpoint store implements.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// Metadata about a stored checkpoint, without the state payload itself.
///
/// Returned by [`CheckpointBackend::list`] and kept alongside the current
/// state and history inside [`crate::memory::CheckpointEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    /// Opaque identifier for this checkpoint entry. In the in-memory backend
    /// this is simply the thread ID; a networked backend might assign a
    /// separate row/object ID.
    pub id: String,
    /// The thread this checkpoint belongs to.
    pub thread_id: String,
    /// When the thread's first checkpoint was saved. Immutable across
    /// successive saves for the same thread.
    pub created_at: SystemTime,
    /// When the thread's checkpoint was last saved. Monotonically
    /// non-decreasing.
    pub updated_at: SystemTime,
    /// An approximate size estimate of the current state, in bytes.
    pub size: usize,
    /// Arbitrary caller-attached metadata.
    pub metadata: HashMap<String, String>,
}

/// A pluggable checkpoint store for a typed state `S`.
///
/// Mirrors the external interface's `save`/`load`/`list`/`delete`/`exists`
/// contract (plus an optional `ping` health probe with a no-op default), so
/// concrete stores — in-memory, a networked KV store, a SQL table — are
/// interchangeable from a caller's perspective. Errors are opaque to callers
/// composing this trait (e.g. [`crate::distributed::DistributedCheckpointer`]).
#[async_trait]
pub trait CheckpointBackend<S>: Send + Sync
where
    S: Send + Sync + 'static,
{
    /// Persists `state` as the current checkpoint for `thread_id`, pushing
    /// whatever was previously current onto that thread's history.
    async fn save(&self, ctx: &CancellationToken, thread_id: &str, state: S) -> Result<()>;

    /// Returns a clone of the current checkpoint for `thread_id`.
    async fn load(&self, ctx: &CancellationToken, thread_id: &str) -> Result<S>;

    /// Returns metadata for every stored thread.
    async fn list(&self, ctx: &CancellationToken) -> Result<Vec<CheckpointInfo>>;

    /// Removes the entire entry (current state and history) for `thread_id`.
    async fn delete(&self, ctx: &CancellationToken, thread_id: &str) -> Result<()>;

    /// Returns `true` if a checkpoint exists for `thread_id`.
    async fn exists(&self, ctx: &CancellationToken, thread_id: &str) -> Result<bool>;

    /// Health probe. Backends that have nothing to check (e.g. the
    /// in-memory store) can rely on the default, always-healthy implementation.
    async fn ping(&self, _ctx: &CancellationToken) -> Result<()> {
        Ok(())
    }
}
