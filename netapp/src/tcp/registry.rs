//! `TcpConnectionRegistry`: a thread-safe map from remote endpoint to the
//! live connection for it, shared by a `TcpServer` or `TcpClientList`.

use super::connection::TcpConnection;
use dashmap::DashMap;
use netcore::endpoint::Endpoint;
use netcore::error::{NetError, Result};
use std::sync::Arc;

/// Keyed by the *remote* endpoint stored on each connection.
#[derive(Default)]
pub struct TcpConnectionRegistry {
    connections: DashMap<Endpoint, Arc<TcpConnection>>,
}

impl TcpConnectionRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `conn` under its current remote endpoint. No-op if the
    /// connection hasn't completed its handshake yet.
    pub fn add(&self, conn: Arc<TcpConnection>) {
        if let Some(remote) = conn.remote_endpoint() {
            self.connections.insert(remote, conn);
        }
    }

    /// Remove the connection registered for `remote`, if any.
    pub fn remove(&self, remote: &Endpoint) {
        self.connections.remove(remote);
    }

    #[must_use]
    pub fn is_connected(&self, target: &Endpoint) -> bool {
        self.connections.get(target).is_some_and(|c| c.is_open())
    }

    #[must_use]
    pub fn num_unsent_async(&self, target: &Endpoint) -> Option<usize> {
        self.connections.get(target).map(|c| c.unsent_async_count())
    }

    /// Look up `target` and forward an async send to it.
    #[must_use]
    pub fn send_async(&self, target: &Endpoint, bytes: &[u8]) -> bool {
        self.connections.get(target).is_some_and(|c| c.send_async(bytes))
    }

    /// Look up `target` and forward a synchronous send to it.
    #[must_use]
    pub fn send_sync(&self, target: &Endpoint, bytes: &[u8]) -> bool {
        self.connections.get(target).is_some_and(|c| c.send_sync(bytes))
    }

    /// Broadcast to every registered connection via async sends.
    pub fn send_to_all(&self, bytes: &[u8]) {
        for entry in &self.connections {
            entry.value().send_async(bytes);
        }
    }

    /// The local side of `remote`'s connection.
    pub fn local_endpoint_for(&self, remote: &Endpoint) -> Result<Endpoint> {
        self.connections
            .get(remote)
            .and_then(|c| c.local_endpoint())
            .ok_or_else(|| NetError::unknown_connection(remote.to_string()))
    }

    /// Close every connection and clear the map.
    pub fn close_all(&self) {
        let conns: Vec<_> = self.connections.iter().map(|e| e.value().clone()).collect();
        self.connections.clear();
        for conn in conns {
            conn.close();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
