//! Fixed-capacity freelists supplying [`crate::Request`]/[`crate::Response`]
//! with clear-and-return discipline.
//!
//! Generalizes the sibling cache-reference crate's `EvictionStore`
//! map-plus-lock idiom into a fixed-capacity freelist: instead of bounding a
//! cache's *contents*, this bounds the number of idle, reusable envelopes
//! kept around between requests. `crossbeam_queue::ArrayQueue` gives a
//! lock-free MPMC ring buffer, so acquiring and releasing an entry never
//! contends with other in-flight requests.

use crossbeam_queue::ArrayQueue;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// A pooled [`Request`], returned to its [`RequestPool`] on drop.
///
/// Callers must not retain a clone of the inner data after the guard is
/// dropped: the fields are cleared and the envelope is handed to the next
/// acquirer, so anything still referencing the old contents would observe
/// stale (or, worse, a future request's) data.
pub struct PooledRequest<In, St> {
    inner: Option<Box<Request<In, St>>>,
    pool: Arc<ArrayQueue<Box<Request<In, St>>>>,
}

impl<In, St> std::ops::Deref for PooledRequest<In, St> {
    type Target = Request<In, St>;
    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().expect("pooled request taken twice")
    }
}

impl<In, St> std::ops::DerefMut for PooledRequest<In, St> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut().expect("pooled request taken twice")
    }
}

impl<In, St: Default> Drop for PooledRequest<In, St> {
    fn drop(&mut self) {
        if let Some(mut req) = self.inner.take() {
            req.clear(St::default());
            let _ = self.pool.push(req);
        }
    }
}

/// A fixed-capacity freelist of [`Request`] envelopes.
pub struct RequestPool<In, St> {
    free: Arc<ArrayQueue<Box<Request<In, St>>>>,
}

impl<In, St: Default> RequestPool<In, St> {
    /// Creates a pool holding up to `capacity` idle envelopes.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// Acquires an envelope for `input`, reusing an idle one if available.
    pub fn acquire(&self, input: In) -> PooledRequest<In, St>
    where
        In: Sized,
    {
        let mut req = self.free.pop().unwrap_or_else(|| Box::new(Request::default()));
        req.input = Some(input);
        req.state = St::default();
        req.created_at = std::time::Instant::now();
        PooledRequest {
            inner: Some(req),
            pool: Arc::clone(&self.free),
        }
    }

    /// Idle envelopes currently held by the pool.
    pub fn idle_count(&self) -> usize {
        self.free.len()
    }
}

/// A pooled [`Response`], returned to its [`ResponsePool`] on drop.
pub struct PooledResponse<Out, St> {
    inner: Option<Box<Response<Out, St>>>,
    pool: Arc<ArrayQueue<Box<Response<Out, St>>>>,
}

impl<Out, St> std::ops::Deref for PooledResponse<Out, St> {
    type Target = Response<Out, St>;
    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().expect("pooled response taken twice")
    }
}

impl<Out, St> std::ops::DerefMut for PooledResponse<Out, St> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut().expect("pooled response taken twice")
    }
}

impl<Out, St: Default> Drop for PooledResponse<Out, St> {
    fn drop(&mut self) {
        if let Some(mut resp) = self.inner.take() {
            resp.clear(St::default());
            let _ = self.pool.push(resp);
        }
    }
}

/// A fixed-capacity freelist of [`Response`] envelopes.
pub struct ResponsePool<Out, St> {
    free: Arc<ArrayQueue<Box<Response<Out, St>>>>,
}

impl<Out, St: Default> ResponsePool<Out, St> {
    /// Creates a pool holding up to `capacity` idle envelopes.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// Acquires an envelope for `output`, reusing an idle one if available.
    pub fn acquire(&self, output: Out) -> PooledResponse<Out, St> {
        let mut resp = self.free.pop().unwrap_or_else(|| Box::new(Response::default()));
        resp.output = Some(output);
        resp.state = St::default();
        PooledResponse {
            inner: Some(resp),
            pool: Arc::clone(&self.free),
        }
    }

    /// Idle envelopes currently held by the pool.
    pub fn idle_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_reuses_released_envelope() {
        let pool: RequestPool<u32, u32> = RequestPool::new(4);
        {
            let mut req = pool.acquire(1);
            req.metadata.insert("k", 1usize);
            req.state = 99;
        }
        assert_eq!(pool.idle_count(), 1);
        let req2 = pool.acquire(2);
        assert!(req2.metadata.is_empty(), "stale metadata must not leak across reuse");
        assert_eq!(req2.state, 0);
    }

    #[test]
    fn response_pool_roundtrip() {
        let pool: ResponsePool<&str, u32> = ResponsePool::new(2);
        {
            let _resp = pool.acquire("first");
        }
        assert_eq!(pool.idle_count(), 1);
        let resp = pool.acquire("second");
        assert_eq!(resp.output, Some("second"));
    }
}
