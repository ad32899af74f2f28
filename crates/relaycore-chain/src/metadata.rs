//! The type-erased metadata bag and string header bag carried by every
//! [`crate::Request`]/[`crate::Response`].

use std::any::Any;
use std::collections::HashMap;

/// A string-keyed bag of arbitrary typed values.
///
/// Backed by a plain `HashMap` rather than a reallocated-per-request map:
/// [`Metadata::clear`] empties the existing map in place (`HashMap::clear`),
/// retaining its allocated capacity, so object-pooled [`crate::Request`]s and
/// [`crate::Response`]s don't pay a fresh allocation on every reuse and never
/// leak a key from a prior occupant.
#[derive(Default)]
pub struct Metadata {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Metadata {
    /// An empty metadata bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, overwriting any previous entry.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Returns a typed reference to the value stored under `key`, if present
    /// and of the requested type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns the typed value stored under `key`.
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key).and_then(|v| v.downcast::<T>().ok()).map(|b| *b)
    }

    /// `true` if `key` is present (regardless of its value's type).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the bag in place, retaining its allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Moves every entry of `other` into `self` that isn't already present,
    /// keyed by name. Used to carry a request's metadata into the response
    /// built from it across the handler boundary, without letting the
    /// handler's own writes be overwritten.
    pub fn merge_missing(&mut self, mut other: Metadata) {
        for (key, value) in other.entries.drain() {
            self.entries.entry(key).or_insert(value);
        }
    }
}

/// Reserved metadata keys with internal-signalling meaning to the chain and
/// its canonical middlewares.
pub mod keys {
    /// A short-circuit [`crate::Response`] a `before` hook may stash for the
    /// chain to use instead of invoking the handler.
    pub const CACHED_RESPONSE: &str = "cached_response";
    /// Set to `true` by the caching middleware when [`CACHED_RESPONSE`] was used.
    pub const CACHE_HIT: &str = "cache_hit";
    /// The fingerprint the caching middleware's `after` hook should key its
    /// store under; empty or absent means "don't cache this response".
    pub const ORIGINAL_INPUT: &str = "original_input";
    /// Set by the timing middleware's `before` hook.
    pub const TIMING_START: &str = "timing_start";
    /// Set by the timing middleware's `after` hook.
    pub const TIMING_DURATION: &str = "timing_duration";
    /// Tool-selection bookkeeping, carried for the agent-execution framework
    /// that also builds on this chain.
    pub const SELECTED_TOOLS: &str = "selected_tools";
    /// Count companion to [`SELECTED_TOOLS`].
    pub const TOOL_COUNT: &str = "tool_count";
    /// Remaining-quota hint set by the rate-limiter middleware.
    pub const RATE_LIMIT_REMAINING: &str = "rate_limit_remaining";
    /// Set to `true` by the authenticator middleware on success.
    pub const AUTHENTICATED: &str = "authenticated";
    /// Set to `true` by the validator middleware on success.
    pub const VALIDATED: &str = "validated";
    /// Name of the last middleware to mutate the request/response, set by
    /// the transformer middleware.
    pub const MODIFIED_BY: &str = "modified_by";
    /// Names of middlewares that have wrapped/observed this exchange.
    pub const WRAPPED_BY: &str = "wrapped_by";
}
