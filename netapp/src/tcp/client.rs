//! `TcpClient`: owns a single outbound [`TcpConnection`], connecting lazily
//! and reconnecting whenever a send finds the connection gone.

use super::connection::{OnMessage, TcpConnection};
use super::registry::TcpConnectionRegistry;
use netcore::endpoint::Endpoint;
use netcore::options::TcpOptions;
use netcore::reactor_pool::ReactorPool;
use netproto::codec::MessageCodec;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

pub struct TcpClient {
    server: Endpoint,
    registry: Arc<TcpConnectionRegistry>,
    options: TcpOptions,
    codec: Arc<MessageCodec>,
    on_message: OnMessage,
    reactor: Arc<ReactorPool>,
    connection: Mutex<Option<Arc<TcpConnection>>>,
}

impl TcpClient {
    #[must_use]
    pub fn new(server: Endpoint, options: TcpOptions, codec: Arc<MessageCodec>, on_message: OnMessage, reactor: Arc<ReactorPool>) -> Arc<Self> {
        Arc::new(Self {
            server,
            registry: TcpConnectionRegistry::new(),
            options,
            codec,
            on_message,
            reactor,
            connection: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn server(&self) -> &Endpoint {
        &self.server
    }

    /// Construct a fresh connection and connect it if the registry is
    /// currently empty (no live connection). Returns `false` if the
    /// connect attempt fails; the constructor itself never panics, but any
    /// failure here preserves retry semantics for the next send.
    fn ensure_connected(self: &Arc<Self>) -> Option<Arc<TcpConnection>> {
        {
            let existing = self.connection.lock().clone();
            if let Some(conn) = existing {
                if conn.is_open() {
                    return Some(conn);
                }
            }
        }

        let conn = TcpConnection::new(self.options, self.codec.clone(), self.on_message.clone(), self.reactor.clone());
        if !conn.connect(self.server.clone(), Arc::downgrade(&self.registry)) {
            warn!(server = %self.server, "tcp client connect failed");
            return None;
        }
        *self.connection.lock() = Some(conn.clone());
        Some(conn)
    }

    #[must_use]
    pub fn send_async(self: &Arc<Self>, bytes: &[u8]) -> bool {
        self.ensure_connected().is_some_and(|c| c.send_async(bytes))
    }

    #[must_use]
    pub fn send_sync(self: &Arc<Self>, bytes: &[u8]) -> bool {
        self.ensure_connected().is_some_and(|c| c.send_sync(bytes))
    }

    pub fn close(&self) {
        if let Some(conn) = self.connection.lock().take() {
            conn.close();
        }
    }

    /// The local endpoint the OS chose for the current connection, if any.
    #[must_use]
    pub fn get_client_details_for_server(&self) -> Option<Endpoint> {
        self.connection.lock().as_ref().and_then(|c| c.local_endpoint())
    }
}
