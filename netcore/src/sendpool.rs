//! Per-connection send-buffer pool: bounds memory under bursty async-write
//! load and avoids a fresh allocation per send when the pool has slots free.
//!
//! Two configurations:
//! - `mem_pool_msg_count > 0`: a fixed array of pre-reserved buffers plus a
//!   free-index queue. Checkout fails (and `send_async` returns `false`)
//!   once every slot is checked out.
//! - `mem_pool_msg_count == 0`: the pool is bypassed entirely. Every send
//!   allocates fresh, and backpressure is enforced solely by the
//!   unsent-async counter against `max_allowed_unsent_async`.

use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A checked-out buffer slot. Returned to its pool (if any) on drop.
pub struct PooledBuffer {
    bytes: BytesMut,
    slot: Option<usize>,
    pool: Option<std::sync::Weak<SendBufferPoolInner>>,
}

impl PooledBuffer {
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.bytes
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let (Some(slot), Some(pool)) = (self.slot, self.pool.take()) {
            if let Some(pool) = pool.upgrade() {
                self.bytes.clear();
                pool.free.lock().push(slot);
            }
        }
    }
}

struct SendBufferPoolInner {
    free: Mutex<Vec<usize>>,
}

/// Per-connection pool of pre-reserved send buffers plus the unsent-async
/// backpressure counter.
///
/// `unsent_async_count` tracks buffers checked out (pooled or freshly
/// allocated) but not yet acknowledged by a completed write, regardless of
/// whether the pool itself is active.
pub struct SendBufferPool {
    inner: Option<std::sync::Arc<SendBufferPoolInner>>,
    buffer_capacity: usize,
    max_allowed_unsent_async: usize,
    unsent_async_count: AtomicUsize,
}

impl SendBufferPool {
    /// `mem_pool_msg_count == 0` bypasses the fixed-slot pool entirely;
    /// `buffer_capacity` is the pre-reserved size of each pooled buffer.
    #[must_use]
    pub fn new(mem_pool_msg_count: usize, buffer_capacity: usize, max_allowed_unsent_async: usize) -> Self {
        let inner = if mem_pool_msg_count == 0 {
            None
        } else {
            Some(std::sync::Arc::new(SendBufferPoolInner {
                free: Mutex::new((0..mem_pool_msg_count).collect()),
            }))
        };
        Self {
            inner,
            buffer_capacity,
            max_allowed_unsent_async,
            unsent_async_count: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn is_bypassed(&self) -> bool {
        self.inner.is_none()
    }

    /// Current count of buffers checked out but not yet returned.
    #[must_use]
    pub fn unsent_async_count(&self) -> usize {
        self.unsent_async_count.load(Ordering::SeqCst)
    }

    /// Check out a buffer for an async send. Returns `None` if the pool is
    /// saturated (pooled mode, no free slots) or the unsent-async cap is
    /// reached (bypass mode).
    pub fn checkout(&self, data: &[u8]) -> Option<PooledBuffer> {
        if self.unsent_async_count.load(Ordering::SeqCst) >= self.max_allowed_unsent_async {
            return None;
        }

        let buffer = match &self.inner {
            Some(inner) => {
                let slot = inner.free.lock().pop()?;
                let mut bytes = BytesMut::with_capacity(self.buffer_capacity.max(data.len()));
                bytes.extend_from_slice(data);
                PooledBuffer {
                    bytes,
                    slot: Some(slot),
                    pool: Some(std::sync::Arc::downgrade(inner)),
                }
            }
            None => {
                let mut bytes = BytesMut::with_capacity(data.len());
                bytes.extend_from_slice(data);
                PooledBuffer {
                    bytes,
                    slot: None,
                    pool: None,
                }
            }
        };

        self.unsent_async_count.fetch_add(1, Ordering::SeqCst);
        Some(buffer)
    }

    /// Acknowledge that a previously checked-out buffer's write completed.
    /// Drop the `PooledBuffer` itself to return it to the pool; call this to
    /// release the unsent-async budget regardless of pool mode.
    pub fn acknowledge(&self) {
        self.unsent_async_count.fetch_sub(1, Ordering::SeqCst);
    }
}
