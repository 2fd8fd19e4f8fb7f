//! `TcpServer`: an acceptor loop that hands every incoming socket a fresh
//! [`TcpConnection`] registered in a shared [`TcpConnectionRegistry`].

use super::connection::{OnMessage, TcpConnection};
use super::registry::TcpConnectionRegistry;
use compio::net::TcpListener;
use futures::FutureExt;
use netcore::endpoint::Endpoint;
use netcore::options::TcpOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use netproto::codec::MessageCodec;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

struct AcceptorHandle {
    stop_tx: flume::Sender<()>,
    closed_event: Arc<SyncEvent>,
}

/// Owns the listening socket and the registry of clients it has accepted.
pub struct TcpServer {
    registry: Arc<TcpConnectionRegistry>,
    options: TcpOptions,
    codec: Arc<MessageCodec>,
    on_message: OnMessage,
    reactor: Arc<ReactorPool>,
    acceptor: Mutex<Option<AcceptorHandle>>,
}

impl TcpServer {
    #[must_use]
    pub fn new(options: TcpOptions, codec: Arc<MessageCodec>, on_message: OnMessage, reactor: Arc<ReactorPool>) -> Arc<Self> {
        Arc::new(Self {
            registry: TcpConnectionRegistry::new(),
            options,
            codec,
            on_message,
            reactor,
            acceptor: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn registry(&self) -> Arc<TcpConnectionRegistry> {
        self.registry.clone()
    }

    /// Bind and start accepting on `listen`. Synchronous at the API surface;
    /// internally runs on the reactor. Reopen after `close_acceptor` is
    /// supported -- each call spins up a fresh acceptor task.
    pub fn bind(self: &Arc<Self>, listen: Endpoint) -> bool {
        let bound = Arc::new(SyncEvent::new(NotifyPolicy::One, ResetPolicy::Manual, false));
        let ok = Arc::new(Mutex::new(false));
        let (stop_tx, stop_rx) = flume::unbounded();
        let closed_event = Arc::new(SyncEvent::new(NotifyPolicy::All, ResetPolicy::Manual, false));

        *self.acceptor.lock() = Some(AcceptorHandle {
            stop_tx,
            closed_event: closed_event.clone(),
        });

        let this = self.clone();
        let bound2 = bound.clone();
        let ok2 = ok.clone();
        self.reactor.post(async move {
            match TcpListener::bind(listen.to_socket_addr()).await {
                Ok(listener) => {
                    *ok2.lock() = true;
                    bound2.signal();
                    this.accept_loop(listener, stop_rx, closed_event).await;
                }
                Err(e) => {
                    warn!(error = %e, listen = %listen, "failed to bind tcp listener");
                    bound2.signal();
                    closed_event.signal();
                }
            }
        });

        bound.wait();
        *ok.lock()
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, stop_rx: flume::Receiver<()>, closed_event: Arc<SyncEvent>) {
        loop {
            let accept = listener.accept().fuse();
            let stop = stop_rx.recv_async().fuse();
            futures::pin_mut!(accept, stop);

            futures::select! {
                result = accept => match result {
                    Ok((stream, addr)) => {
                        let SocketAddr::V4(v4) = addr else {
                            debug!("rejecting non-ipv4 peer");
                            continue;
                        };
                        let conn = TcpConnection::new(self.options, self.codec.clone(), self.on_message.clone(), self.reactor.clone());
                        conn.adopt_accepted(stream, v4.into(), Arc::downgrade(&self.registry));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed; retrying");
                    }
                },
                _ = stop => break,
            }
        }
        closed_event.signal();
    }

    /// Stop accepting new connections. Idempotent; waits for the acceptor
    /// task to actually exit.
    pub fn close_acceptor(&self) {
        let Some(handle) = self.acceptor.lock().take() else {
            return;
        };
        let _ = handle.stop_tx.send(());
        handle.closed_event.wait();
    }

    #[must_use]
    pub fn send_to_client(&self, client: &Endpoint, bytes: &[u8]) -> bool {
        self.registry.send_async(client, bytes)
    }

    pub fn send_to_all_clients(&self, bytes: &[u8]) {
        self.registry.send_to_all(bytes);
    }
}
