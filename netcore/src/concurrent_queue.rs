//! `ConcurrentQueue`: an unbounded multi-producer multi-consumer FIFO with
//! blocking/timed/try pop and steal-from-back, coordinated by a
//! [`SyncEvent`].

use crate::error::{NetError, Result};
use crate::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Unbounded FIFO queue with blocking and non-blocking pop variants.
///
/// `push`/`pop` observe strict FIFO order for a single consumer; with
/// multiple consumers each item still goes to exactly one of them.
pub struct ConcurrentQueue<T> {
    items: Mutex<VecDeque<T>>,
    event: SyncEvent,
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            event: SyncEvent::new(NotifyPolicy::One, ResetPolicy::Manual, false),
        }
    }

    /// Append an item. Never blocks.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        items.push_back(item);
        self.event.signal();
    }

    /// Current number of queued items.
    #[must_use]
    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn try_take_front(&self) -> Option<T> {
        let mut items = self.items.lock();
        let item = items.pop_front();
        if items.is_empty() {
            self.event.reset();
        }
        item
    }

    fn try_take_back(&self) -> Option<T> {
        let mut items = self.items.lock();
        let item = items.pop_back();
        if items.is_empty() {
            self.event.reset();
        }
        item
    }

    /// Wait forever for an item. Returns `false` only if a concurrent
    /// `break_pop_wait` raced with an empty queue.
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        loop {
            if let Some(item) = self.try_take_front() {
                return Some(item);
            }
            self.event.wait();
            if let Some(item) = self.try_take_front() {
                return Some(item);
            }
            if !self.event.is_signalled() {
                // break_pop_wait fired with nothing to deliver.
                return None;
            }
        }
    }

    /// Like [`Self::pop`] but returns a `QueueEmpty` error instead of `None`.
    pub fn pop_or_err(&self) -> Result<T> {
        self.pop().ok_or(NetError::QueueEmpty)
    }

    /// Non-blocking pop.
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        self.try_take_front()
    }

    /// Pop with a deadline. Returns `None` on timeout or a spurious wake
    /// with an empty queue.
    #[must_use]
    pub fn timed_pop(&self, timeout: Duration) -> Option<T> {
        if let Some(item) = self.try_take_front() {
            return Some(item);
        }
        if !self.event.wait_for(timeout) {
            return None;
        }
        self.try_take_front()
    }

    /// Like [`Self::timed_pop`] but returns `QueueTimeout`/`QueueEmpty`.
    pub fn timed_pop_or_err(&self, timeout: Duration) -> Result<T> {
        self.timed_pop(timeout).ok_or(NetError::QueueTimeout)
    }

    /// Pop from the back instead of the front.
    #[must_use]
    pub fn try_steal(&self) -> Option<T> {
        self.try_take_back()
    }

    /// Unblock a consumer waiting in `pop`/`timed_pop` without enqueuing
    /// anything.
    pub fn break_pop_wait(&self) {
        self.event.signal();
    }

    /// Drain every queued item, preserving push order.
    pub fn take_all(&self) -> Vec<T> {
        let mut items = self.items.lock();
        self.event.reset();
        items.drain(..).collect()
    }
}

impl<T: Clone> ConcurrentQueue<T> {
    /// Read the item at `index` without popping it.
    #[must_use]
    pub fn peek(&self, index: usize) -> Option<T> {
        self.items.lock().get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_preserved() {
        let q = ConcurrentQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn try_pop_on_empty_is_none() {
        let q: ConcurrentQueue<i32> = ConcurrentQueue::new();
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn timed_pop_times_out() {
        let q: ConcurrentQueue<i32> = ConcurrentQueue::new();
        assert_eq!(q.timed_pop(Duration::from_millis(20)), None);
    }

    #[test]
    fn try_steal_pops_from_back() {
        let q = ConcurrentQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.try_steal(), Some(3));
        assert_eq!(q.pop(), Some(1));
    }

    #[test]
    fn take_all_drains_in_push_order() {
        let q = ConcurrentQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.take_all(), vec![1, 2, 3]);
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn peek_does_not_remove() {
        let q = ConcurrentQueue::new();
        q.push(10);
        assert_eq!(q.peek(0), Some(10));
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn blocking_pop_observes_concurrent_push() {
        let q = Arc::new(ConcurrentQueue::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.pop());
        thread::sleep(Duration::from_millis(10));
        q.push(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn break_pop_wait_unblocks_consumer() {
        let q: Arc<ConcurrentQueue<i32>> = Arc::new(ConcurrentQueue::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.pop());
        thread::sleep(Duration::from_millis(10));
        q.break_pop_wait();
        assert_eq!(handle.join().unwrap(), None);
    }
}
