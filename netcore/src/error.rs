//! Error types for the networking core.
//!
//! Covers the taxonomy that crosses the `netcore` boundary: connection
//! lifecycle, queue timeouts, and worker lifecycle. Framing/archive errors
//! live in `netproto::error` since they only make sense once a wire format
//! exists.

use std::io;
use thiserror::Error;

/// Errors surfaced by `netcore` primitives.
#[derive(Error, Debug)]
pub enum NetError {
    /// IO error during socket operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A connect attempt failed, including a hard timeout.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A send found no live connection for the target endpoint.
    #[error("connection closed")]
    ConnectionClosed,

    /// `ConcurrentQueue::pop`/`timed_pop` "throw" variants found nothing.
    #[error("queue empty")]
    QueueEmpty,

    /// `ConcurrentQueue::timed_pop` "throw" variant hit its deadline.
    #[error("queue timed out")]
    QueueTimeout,

    /// `MessageQueueWorker` could not start its dedicated thread.
    #[error("worker failed to start: {0}")]
    WorkerStartFailed(String),

    /// `MessageQueueWorker::register_handler` called twice for the same id.
    #[error("handler already registered for id {0}")]
    HandlerAlreadyRegistered(u32),

    /// A registry lookup found no connection for the given endpoint.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// An async send was refused because the send-buffer pool or the
    /// unsent-async counter is saturated. Reported as `false` at the public
    /// API; this variant exists for callers that want the reason.
    #[error("backpressure: send refused")]
    Backpressure,
}

/// Result alias for `netcore` operations.
pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    #[must_use]
    pub fn connect_failed(msg: impl Into<String>) -> Self {
        Self::ConnectFailed(msg.into())
    }

    #[must_use]
    pub fn unknown_connection(endpoint: impl Into<String>) -> Self {
        Self::UnknownConnection(endpoint.into())
    }

    /// Whether retrying the same operation could plausibly succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            )
        )
    }
}
