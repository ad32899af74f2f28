//! The request envelope threaded through a [`crate::Chain`] execution.

use crate::metadata::Metadata;
use std::collections::HashMap;
use std::time::Instant;

/// A request flowing through the interceptor chain.
///
/// Acquired from a [`crate::RequestPool`] on chain entry and returned to the
/// pool on exit; `St` is the request-scoped state type the caller threads
/// through `before`/`after` hooks (session data, accumulated tool calls,
/// whatever the embedding service needs), and `In` is the typed handler
/// input.
pub struct Request<In, St> {
    /// The typed input payload the terminal handler will consume.
    pub input: Option<In>,
    /// Request-scoped state, mutated by middleware hooks as the request
    /// traverses the chain.
    pub state: St,
    /// An opaque handle to whatever runtime context the embedding service
    /// wants available to hooks (a tracing span, a database handle, ...).
    /// Boxed as `Any` so the chain itself stays generic over it.
    pub runtime_handle: Option<Box<dyn std::any::Any + Send + Sync>>,
    /// Internal-signalling and observability metadata (see [`crate::metadata::keys`]).
    pub metadata: Metadata,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// When this request entered the chain.
    pub created_at: Instant,
}

impl<In, St: Default> Request<In, St> {
    /// Builds a fresh request around `input`, with default state and no
    /// runtime handle, headers, or metadata.
    pub fn new(input: In) -> Self {
        Self {
            input: Some(input),
            state: St::default(),
            runtime_handle: None,
            metadata: Metadata::new(),
            headers: HashMap::new(),
            created_at: Instant::now(),
        }
    }
}

impl<In, St: Default> Default for Request<In, St> {
    fn default() -> Self {
        Self {
            input: None,
            state: St::default(),
            runtime_handle: None,
            metadata: Metadata::new(),
            headers: HashMap::new(),
            created_at: Instant::now(),
        }
    }
}

impl<In, St> Request<In, St> {
    /// Resets every field to a clean slate for return to an object pool.
    /// Clears (rather than reallocates) the metadata and header maps so
    /// their backing capacity survives into the next occupant.
    pub fn clear(&mut self, state: St) {
        self.input = None;
        self.state = state;
        self.runtime_handle = None;
        self.metadata.clear();
        self.headers.clear();
        self.created_at = Instant::now();
    }
}
