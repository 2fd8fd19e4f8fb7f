//! `MessageQueueWorker`: a dedicated-thread consumer that dispatches queued
//! messages to per-id handlers in strict push order.

use crate::concurrent_queue::ConcurrentQueue;
use crate::error::{NetError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// What happens to items still queued when the worker is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerDestroyPolicy {
    /// Drain remaining items through their registered handlers.
    ProcessRemaining,
    /// Drop remaining items straight to the deleter, skipping handlers.
    DiscardRemaining,
}

type Handler<Msg> = Box<dyn FnMut(&mut Msg) -> bool + Send>;
type Decoder<Msg> = Box<dyn Fn(&Msg) -> Option<u32> + Send + Sync>;
type Deleter<Msg> = Box<dyn Fn(Msg) + Send + Sync>;

struct Shared<Msg> {
    queue: Arc<ConcurrentQueue<Msg>>,
    handlers: Mutex<HashMap<u32, Handler<Msg>>>,
}

/// Owns a dedicated consumer thread that pops messages off an internal
/// [`ConcurrentQueue`], decodes each to an id, and invokes the handler
/// registered for that id.
///
/// Handler, decoder, and deleter panics are caught and logged rather than
/// propagated, so one bad callback cannot kill the worker thread.
pub struct MessageQueueWorker<Msg: Send + 'static> {
    shared: Arc<Shared<Msg>>,
    thread: Option<JoinHandle<()>>,
}

impl<Msg: Send + 'static> MessageQueueWorker<Msg> {
    /// Start the worker thread. Fails only if the OS refuses to spawn it.
    pub fn new(
        decoder: impl Fn(&Msg) -> Option<u32> + Send + Sync + 'static,
        deleter: impl Fn(Msg) + Send + Sync + 'static,
        destroy_policy: WorkerDestroyPolicy,
    ) -> Result<Self> {
        let queue = Arc::new(ConcurrentQueue::new());
        let shared = Arc::new(Shared {
            queue: queue.clone(),
            handlers: Mutex::new(HashMap::new()),
        });
        let decoder: Decoder<Msg> = Box::new(decoder);
        let deleter: Deleter<Msg> = Box::new(deleter);
        let worker_shared = shared.clone();

        let thread = thread::Builder::new()
            .name("message-queue-worker".into())
            .spawn(move || run(worker_shared, queue, decoder, deleter, destroy_policy))
            .map_err(|e| NetError::WorkerStartFailed(e.to_string()))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Bind a handler for `id`. Fails if one is already registered.
    pub fn register_handler(
        &self,
        id: u32,
        handler: impl FnMut(&mut Msg) -> bool + Send + 'static,
    ) -> Result<()> {
        let mut handlers = self.shared.handlers.lock();
        if handlers.contains_key(&id) {
            return Err(NetError::HandlerAlreadyRegistered(id));
        }
        handlers.insert(id, Box::new(handler));
        Ok(())
    }

    /// Enqueue a message for dispatch.
    pub fn push(&self, msg: Msg) {
        self.shared.queue.push(msg);
    }

    /// Number of messages not yet dispatched.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.size()
    }
}

impl<Msg: Send + 'static> Drop for MessageQueueWorker<Msg> {
    fn drop(&mut self) {
        self.shared.queue.break_pop_wait();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run<Msg>(
    shared: Arc<Shared<Msg>>,
    queue: Arc<ConcurrentQueue<Msg>>,
    decoder: Decoder<Msg>,
    deleter: Deleter<Msg>,
    destroy_policy: WorkerDestroyPolicy,
) where
    Msg: Send + 'static,
{
    // `queue.pop()` returns `None` once `break_pop_wait` has fired with
    // nothing left queued, i.e. shutdown.
    while let Some(msg) = queue.pop() {
        dispatch_one(&shared, &decoder, &deleter, msg);
    }

    match destroy_policy {
        WorkerDestroyPolicy::ProcessRemaining => {
            for msg in queue.take_all() {
                dispatch_one(&shared, &decoder, &deleter, msg);
            }
        }
        WorkerDestroyPolicy::DiscardRemaining => {
            for msg in queue.take_all() {
                deleter(msg);
            }
        }
    }
}

fn dispatch_one<Msg>(shared: &Arc<Shared<Msg>>, decoder: &Decoder<Msg>, deleter: &Deleter<Msg>, mut msg: Msg) {
    let id = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| decoder(&msg)))
        .unwrap_or_else(|_| {
            warn!("message decoder panicked; treating as unhandled");
            None
        });

    let Some(id) = id else {
        deleter(msg);
        return;
    };

    let mut handlers = shared.handlers.lock();
    let Some(handler) = handlers.get_mut(&id) else {
        drop(handlers);
        debug!(id, "no handler registered; deleting message");
        deleter(msg);
        return;
    };

    let may_delete = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&mut msg))).unwrap_or_else(|_| {
        warn!(id, "message handler panicked");
        true
    });
    drop(handlers);

    if may_delete {
        deleter(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    struct TestMsg {
        id: u32,
        payload: u32,
    }

    #[test]
    fn dispatches_by_id_in_push_order() {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_handler = seen.clone();

        let worker = MessageQueueWorker::new(
            |m: &TestMsg| Some(m.id),
            |_m: TestMsg| {},
            WorkerDestroyPolicy::ProcessRemaining,
        )
        .unwrap();

        worker
            .register_handler(1, move |m: &mut TestMsg| {
                seen_handler.lock().push(m.payload);
                true
            })
            .unwrap();

        worker.push(TestMsg { id: 1, payload: 10 });
        worker.push(TestMsg { id: 1, payload: 20 });
        worker.push(TestMsg { id: 1, payload: 30 });

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seen.lock().len() < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(*seen.lock(), vec![10, 20, 30]);
    }

    #[test]
    fn duplicate_handler_registration_fails() {
        let worker = MessageQueueWorker::new(
            |_m: &TestMsg| Some(0),
            |_m: TestMsg| {},
            WorkerDestroyPolicy::ProcessRemaining,
        )
        .unwrap();
        worker.register_handler(5, |_m| true).unwrap();
        assert!(matches!(
            worker.register_handler(5, |_m| true),
            Err(NetError::HandlerAlreadyRegistered(5))
        ));
    }

    #[test]
    fn unhandled_id_goes_to_deleter() {
        let deleted = Arc::new(AtomicUsize::new(0));
        let deleted2 = deleted.clone();

        let worker = MessageQueueWorker::new(
            |m: &TestMsg| Some(m.id),
            move |_m: TestMsg| {
                deleted2.fetch_add(1, Ordering::SeqCst);
            },
            WorkerDestroyPolicy::ProcessRemaining,
        )
        .unwrap();

        worker.push(TestMsg { id: 99, payload: 0 });

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while deleted.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_returning_false_suppresses_delete() {
        let deleted = Arc::new(AtomicUsize::new(0));
        let deleted2 = deleted.clone();

        let worker = MessageQueueWorker::new(
            |m: &TestMsg| Some(m.id),
            move |_m: TestMsg| {
                deleted2.fetch_add(1, Ordering::SeqCst);
            },
            WorkerDestroyPolicy::ProcessRemaining,
        )
        .unwrap();
        worker.register_handler(1, |_m| false).unwrap();
        worker.push(TestMsg { id: 1, payload: 0 });

        thread::sleep(Duration::from_millis(100));
        assert_eq!(deleted.load(Ordering::SeqCst), 0);
    }
}
