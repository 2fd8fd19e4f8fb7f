//! `ReactorPool`: N OS threads, each driving its own `compio` I/O runtime,
//! sharing a single work queue so arbitrary futures can be posted onto
//! whichever thread picks them up next.
//!
//! `compio`'s `Runtime` is single-threaded per instance (it owns one
//! `io_uring`/epoll driver), so "N threads sharing a reactor" here means N
//! independent runtimes fed from one `post()` queue rather than one runtime
//! shared across threads -- the same shape the teacher crate uses for its
//! per-socket `Runtime::new().block_on(...)` driver thread, just pooled.

use flume::{Receiver, Sender};
use std::future::Future;
use std::pin::Pin;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A pool of reactor-driving threads with a shared `post()` work queue.
///
/// Holding a `ReactorPool` alive keeps its threads alive (the "work guard"
/// from the spec): dropping it closes the task channel and joins every
/// thread, which only returns once each thread's runtime drains its
/// in-flight futures.
pub struct ReactorPool {
    sender: Sender<BoxedTask>,
    threads: Vec<JoinHandle<()>>,
}

impl ReactorPool {
    /// Start a pool with `thread_count` driver threads. Falls back to 1 if
    /// `thread_count` is 0.
    #[must_use]
    pub fn new(thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        let (sender, receiver) = flume::unbounded::<BoxedTask>();

        let threads = (0..thread_count)
            .map(|idx| spawn_driver(idx, receiver.clone()))
            .collect();

        Self { sender, threads }
    }

    /// Start a pool sized to the available hardware concurrency (at least
    /// one thread).
    #[must_use]
    pub fn with_hardware_concurrency() -> Self {
        Self::new(num_cpus::get().max(1))
    }

    /// Number of driver threads in the pool.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Schedule a future onto the pool. Whichever idle driver thread wakes
    /// first picks it up.
    pub fn post<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.sender.send(Box::pin(fut)).is_err() {
            error!("reactor pool task channel closed; dropping posted task");
        }
    }
}

fn spawn_driver(idx: usize, receiver: Receiver<BoxedTask>) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("reactor-pool-{idx}"))
        .spawn(move || {
            let runtime = match compio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(thread = idx, error = %e, "failed to start compio runtime");
                    return;
                }
            };
            runtime.block_on(async {
                while let Ok(task) = receiver.recv_async().await {
                    // Spawn rather than await directly: posted tasks are
                    // frequently long-lived (a connection's read/write
                    // loop, an acceptor), and awaiting one in this loop
                    // would starve every other task queued for this
                    // thread. `spawn` puts it on this runtime's local
                    // executor so many such tasks interleave concurrently;
                    // detaching means a still-running task is simply
                    // dropped (and its `io_uring` ops canceled) once the
                    // runtime itself shuts down, rather than blocking
                    // shutdown on it forever.
                    compio::runtime::spawn(task).detach();
                }
                debug!(thread = idx, "reactor pool driver shutting down");
            });
        })
        .expect("failed to spawn reactor pool driver thread")
}

impl Drop for ReactorPool {
    fn drop(&mut self) {
        // Dropping the sender side closes the channel; each driver's
        // `recv_async` loop exits once it drains pending tasks.
        let threads = std::mem::take(&mut self.threads);
        drop(std::mem::replace(&mut self.sender, flume::unbounded().0));
        for thread in threads {
            let _ = thread.join();
        }
    }
}
