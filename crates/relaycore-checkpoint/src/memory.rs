//! In-memory checkpoint store.
//!
//! Generalizes a health-check wrapper's
//! `Arc<RwLock<Vec<HealthCheckedContext<T>>>>` shape into a keyed
//! `Arc<RwLock<HashMap<String, CheckpointEntry<S>>>>`: one reader-writer
//! lock guarding every thread's entry, rather than a lock per entry, since
//! saves are expected to be infrequent relative to reads.

use crate::backend::{CheckpointBackend, CheckpointInfo};
use crate::error::{CheckpointError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// A thread's current state, its full history of prior states, and metadata.
///
/// History grows unbounded by append; `current_state` mutation only ever
/// updates `info.updated_at`, never `info.created_at`.
#[derive(Clone)]
pub struct CheckpointEntry<S> {
    /// The most recently saved state.
    pub current_state: S,
    /// Every state that was current before the most recent save, oldest first.
    pub history: Vec<S>,
    /// Metadata about this entry.
    pub info: CheckpointInfo,
}

/// Rough, non-authoritative size estimate for a state value. Accounts only
/// for the value's stack footprint; states holding heap-allocated
/// collections will under-report. Good enough for the informational
/// `CheckpointInfo::size` field, not for capacity planning.
fn estimate_size<S>(state: &S) -> usize {
    std::mem::size_of_val(state)
}

/// An in-process, reader-writer-lock-guarded checkpoint store.
///
/// Saves and loads defensively clone: a reference to stored state is never
/// handed out, so callers cannot mutate an entry they do not own.
pub struct InMemoryCheckpointer<S> {
    store: Arc<RwLock<HashMap<String, CheckpointEntry<S>>>>,
}

impl<S> InMemoryCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Returns a clone of the full entry (current state, history, and info)
    /// for `thread_id`, if one exists. Used by [`crate::cleanup`] and tests
    /// that need more than `load` exposes.
    pub async fn entry(&self, thread_id: &str) -> Option<CheckpointEntry<S>> {
        self.store.read().await.get(thread_id).cloned()
    }

    /// Number of threads currently tracked.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns `true` if no thread has a stored checkpoint.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

impl<S> Default for InMemoryCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<S> CheckpointBackend<S> for InMemoryCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn save(&self, _ctx: &CancellationToken, thread_id: &str, state: S) -> Result<()> {
        let mut guard = self.store.write().await;
        let now = SystemTime::now();
        match guard.get_mut(thread_id) {
            Some(entry) => {
                let prior = std::mem::replace(&mut entry.current_state, state.clone());
                entry.history.push(prior);
                entry.info.updated_at = now;
                entry.info.size = estimate_size(&state);
            }
            None => {
                let size = estimate_size(&state);
                guard.insert(
                    thread_id.to_string(),
                    CheckpointEntry {
                        current_state: state,
                        history: Vec::new(),
                        info: CheckpointInfo {
                            id: thread_id.to_string(),
                            thread_id: thread_id.to_string(),
                            created_at: now,
                            updated_at: now,
                            size,
                            metadata: HashMap::new(),
                        },
                    },
                );
            }
        }
        Ok(())
    }

    async fn load(&self, _ctx: &CancellationToken, thread_id: &str) -> Result<S> {
        self.store
            .read()
            .await
            .get(thread_id)
            .map(|entry| entry.current_state.clone())
            .ok_or_else(|| CheckpointError::NotFound {
                thread_id: thread_id.to_string(),
            })
    }

    async fn list(&self, _ctx: &CancellationToken) -> Result<Vec<CheckpointInfo>> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .map(|entry| entry.info.clone())
            .collect())
    }

    async fn delete(&self, _ctx: &CancellationToken, thread_id: &str) -> Result<()> {
        self.store.write().await.remove(thread_id);
        Ok(())
    }

    async fn exists(&self, _ctx: &CancellationToken, thread_id: &str) -> Result<bool> {
        Ok(self.store.read().await.contains_key(thread_id))
    }
}
