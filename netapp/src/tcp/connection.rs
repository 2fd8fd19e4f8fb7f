//! `TcpConnection`: one accepted-or-connected socket, its framed read loop,
//! and its write strand.
//!
//! Concurrency note: the spec models reads and writes on one connection as
//! serialized by a single "strand". Here that's realized as two independent
//! single-consumer loops -- a read loop and a write loop -- each owning its
//! own half of a `dup`'d socket ([`netcore::tcp::split_tcp_stream`]). Reads
//! are already serialized (one loop, one iteration at a time) and writes
//! are serialized by routing every send through the write loop's channel,
//! so both of the spec's per-class ordering invariants hold; the two
//! classes just don't block each other, which a literal single-threaded
//! strand would not allow. See `DESIGN.md`.

use super::registry::TcpConnectionRegistry;
use bytes::BytesMut;
use compio::io::{AsyncReadExt, AsyncWriteExt};
use compio::net::TcpStream;
use netcore::endpoint::Endpoint;
use netcore::options::TcpOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::sendpool::SendBufferPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use netproto::codec::MessageCodec;
use netproto::message::ReceivedMessage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Lifecycle state of a [`TcpConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Invoked once per fully-framed message the read loop delivers.
pub type OnMessage = Arc<dyn Fn(ReceivedMessage) + Send + Sync>;

enum WriteJob {
    /// An async send: the checked-out pool buffer, held until the write
    /// completes so its slot isn't recycled mid-flight.
    Async(netcore::sendpool::PooledBuffer),
    /// A sync send: the caller blocks on `done` for the write's outcome.
    Sync(Vec<u8>, Arc<SyncEvent>, Arc<Mutex<bool>>),
    Shutdown,
}

/// One TCP connection: either side of an accept or a connect.
///
/// Shared ownership: the registry and every in-flight read/write task hold
/// an `Arc<TcpConnection>`; the socket closes when the last one drops.
pub struct TcpConnection {
    state: Mutex<ConnectionState>,
    remote: Mutex<Option<Endpoint>>,
    local: Mutex<Option<Endpoint>>,
    closing: AtomicBool,
    closed_event: Arc<SyncEvent>,
    write_tx: Mutex<Option<flume::Sender<WriteJob>>>,
    send_pool: SendBufferPool,
    options: TcpOptions,
    codec: Arc<MessageCodec>,
    on_message: OnMessage,
    registry: Mutex<Option<Weak<TcpConnectionRegistry>>>,
    reactor: Arc<ReactorPool>,
}

impl TcpConnection {
    #[must_use]
    pub fn new(options: TcpOptions, codec: Arc<MessageCodec>, on_message: OnMessage, reactor: Arc<ReactorPool>) -> Arc<Self> {
        let pool_opts = options.send_buffer_pool;
        Arc::new(Self {
            state: Mutex::new(ConnectionState::Idle),
            remote: Mutex::new(None),
            local: Mutex::new(None),
            closing: AtomicBool::new(false),
            closed_event: Arc::new(SyncEvent::new(NotifyPolicy::All, ResetPolicy::Manual, false)),
            write_tx: Mutex::new(None),
            send_pool: SendBufferPool::new(
                pool_opts.mem_pool_msg_count,
                pool_opts.buffer_capacity,
                pool_opts.max_allowed_unsent_async,
            ),
            options,
            codec,
            on_message,
            registry: Mutex::new(None),
            reactor,
        })
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    #[must_use]
    pub fn remote_endpoint(&self) -> Option<Endpoint> {
        self.remote.lock().clone()
    }

    #[must_use]
    pub fn local_endpoint(&self) -> Option<Endpoint> {
        self.local.lock().clone()
    }

    #[must_use]
    pub fn unsent_async_count(&self) -> usize {
        self.send_pool.unsent_async_count()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn set_registry(&self, registry: Weak<TcpConnectionRegistry>) {
        *self.registry.lock() = Some(registry);
    }

    /// Connect to `remote`. Synchronous at the API surface (blocks the
    /// calling thread up to `options.connect_timeout`) but runs entirely on
    /// the reactor pool internally.
    pub fn connect(self: &Arc<Self>, remote: Endpoint, registry: Weak<TcpConnectionRegistry>) -> bool {
        *self.state.lock() = ConnectionState::Connecting;
        let done = Arc::new(SyncEvent::new(NotifyPolicy::One, ResetPolicy::Manual, false));
        let ok = Arc::new(Mutex::new(false));

        let this = self.clone();
        let done2 = done.clone();
        let ok2 = ok.clone();
        let timeout = self.options.connect_timeout;

        self.reactor.post(async move {
            let addr = remote.to_socket_addr();
            let outcome = compio::time::timeout(timeout, TcpStream::connect(addr)).await;
            match outcome {
                Ok(Ok(stream)) => {
                    this.set_registry(registry);
                    this.on_socket_established(stream, remote);
                    *ok2.lock() = true;
                }
                Ok(Err(e)) => warn!(error = %e, "tcp connect failed"),
                Err(_) => warn!(remote = %remote, "tcp connect timed out"),
            }
            done2.signal();
        });

        done.wait();
        let connected = *ok.lock();
        if !connected {
            *self.state.lock() = ConnectionState::Closed;
            self.closed_event.signal();
        }
        connected
    }

    /// Take ownership of an already-connected/accepted socket (used by
    /// `connect` and by `TcpServer`'s acceptor), spin up the read loop and
    /// write strand, and flip to `Open`.
    fn on_socket_established(self: &Arc<Self>, stream: TcpStream, remote: Endpoint) {
        if let Err(e) = netcore::tcp::set_tcp_nodelay(&stream, self.options.nagle.nodelay()) {
            warn!(error = %e, "failed to apply nagle option");
        }

        let local = stream
            .local_addr()
            .ok()
            .and_then(|a| if let std::net::SocketAddr::V4(v4) = a { Some(Endpoint::from(v4)) } else { None });

        let (read_half, write_half) = match netcore::tcp::split_tcp_stream(stream) {
            Ok(halves) => halves,
            Err(e) => {
                warn!(error = %e, "failed to split tcp stream");
                *self.state.lock() = ConnectionState::Closed;
                self.closed_event.signal();
                return;
            }
        };

        *self.remote.lock() = Some(remote.clone());
        *self.local.lock() = local;
        *self.state.lock() = ConnectionState::Open;

        let (tx, rx) = flume::unbounded();
        *self.write_tx.lock() = Some(tx);

        let reader = self.clone();
        self.reactor.post(async move { reader.read_loop(read_half).await });

        let writer = self.clone();
        self.reactor.post(async move { writer.write_loop(write_half, rx).await });

        if let Some(registry) = self.registry.lock().as_ref().and_then(Weak::upgrade) {
            registry.add(self.clone());
        }
    }

    /// Hand an accepted socket straight to this (freshly constructed)
    /// connection; used by `TcpServer`.
    pub(crate) fn adopt_accepted(self: &Arc<Self>, stream: TcpStream, remote: Endpoint, registry: Weak<TcpConnectionRegistry>) {
        self.set_registry(registry);
        self.on_socket_established(stream, remote);
    }

    async fn read_loop(self: Arc<Self>, mut read_half: TcpStream) {
        let mut accumulator = BytesMut::new();
        let mut want = self.options.min_amount_to_read;

        loop {
            let buf = vec![0u8; want];
            let compio::buf::BufResult(res, buf) = read_half.read(buf).await;
            let n = match res {
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "tcp read failed");
                    self.on_stream_error();
                    break;
                }
            };

            if n == 0 {
                debug!("peer closed connection");
                self.on_stream_error();
                break;
            }

            if n < want {
                // Short read: discard the in-progress frame and restart.
                accumulator.clear();
                want = self.options.min_amount_to_read;
                continue;
            }

            accumulator.extend_from_slice(&buf[..n]);

            match self.codec.bytes_left_to_read(&accumulator) {
                Ok(0) => {
                    let frame = accumulator.split().freeze();
                    match self.codec.on_message(frame) {
                        Ok(msg) => (self.on_message)(msg),
                        Err(e) => debug!(error = %e, "dropping malformed frame"),
                    }
                    accumulator.clear();
                    want = self.options.min_amount_to_read;
                }
                Ok(more) => want = more,
                Err(e) => {
                    debug!(error = %e, "framing error; resetting accumulator");
                    accumulator.clear();
                    want = self.options.min_amount_to_read;
                }
            }
        }
    }

    async fn write_loop(self: Arc<Self>, mut write_half: TcpStream, rx: flume::Receiver<WriteJob>) {
        while let Ok(job) = rx.recv_async().await {
            match job {
                WriteJob::Async(buf) => {
                    let len = buf.as_slice().len();
                    let data = buf.as_slice().to_vec();
                    let compio::buf::BufResult(res, _) = write_half.write(data).await;
                    drop(buf); // returns the slot to the pool now that the write is done
                    self.send_pool.acknowledge();
                    match res {
                        Ok(n) if n == len => {}
                        Ok(_) => {
                            debug!("partial async write; tearing down connection");
                            self.on_stream_error();
                        }
                        Err(e) => {
                            debug!(error = %e, "async write failed");
                            self.on_stream_error();
                        }
                    }
                }
                WriteJob::Sync(data, done, ok) => {
                    let len = data.len();
                    let compio::buf::BufResult(res, _) = write_half.write(data).await;
                    let success = matches!(res, Ok(n) if n == len);
                    *ok.lock() = success;
                    if !success {
                        self.on_stream_error();
                    }
                    done.signal();
                }
                WriteJob::Shutdown => {
                    let _ = write_half.shutdown().await;
                    break;
                }
            }
        }
        *self.state.lock() = ConnectionState::Closed;
        self.closed_event.signal();
    }

    /// Self-deregister on any read/write failure, unless already closing
    /// (close already removes from the registry).
    fn on_stream_error(&self) {
        if self.closing.load(Ordering::SeqCst) {
            return;
        }
        *self.state.lock() = ConnectionState::Closed;
        if let Some(registry) = self.registry.lock().as_ref().and_then(Weak::upgrade) {
            if let Some(remote) = self.remote_endpoint() {
                registry.remove(&remote);
            }
        }
    }

    /// Synchronous send: blocks until the write completes or fails.
    /// Returns whether the full buffer made it out in one write.
    #[must_use]
    pub fn send_sync(&self, bytes: &[u8]) -> bool {
        let Some(tx) = self.write_tx.lock().clone() else {
            return false;
        };
        let done = Arc::new(SyncEvent::new(NotifyPolicy::One, ResetPolicy::Manual, false));
        let ok = Arc::new(Mutex::new(false));
        if tx.send(WriteJob::Sync(bytes.to_vec(), done.clone(), ok.clone())).is_err() {
            return false;
        }
        done.wait();
        *ok.lock()
    }

    /// Async send: checks out a send-buffer slot and posts the write onto
    /// the write strand. Returns `false` immediately (without queuing) if
    /// the pool or the unsent-async cap is saturated.
    #[must_use]
    pub fn send_async(&self, bytes: &[u8]) -> bool {
        let Some(tx) = self.write_tx.lock().clone() else {
            return false;
        };
        let Some(buf) = self.send_pool.checkout(bytes) else {
            return false;
        };
        tx.send(WriteJob::Async(buf)).is_ok()
    }

    /// Idempotent close: signals the write strand to shut down the socket
    /// and blocks until the closed event fires.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            self.closed_event.wait();
            return;
        }
        let tx = self.write_tx.lock().take();
        match tx {
            Some(tx) => {
                if tx.send(WriteJob::Shutdown).is_err() {
                    *self.state.lock() = ConnectionState::Closed;
                    self.closed_event.signal();
                } else {
                    *self.state.lock() = ConnectionState::Closing;
                }
            }
            None => {
                *self.state.lock() = ConnectionState::Closed;
                self.closed_event.signal();
            }
        }
        self.closed_event.wait();
    }
}
