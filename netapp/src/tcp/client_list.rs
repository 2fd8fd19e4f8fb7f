//! `TcpClientList`: a thread-safe `Endpoint(server) -> TcpClient` map that
//! lazily creates a client the first time a given server is addressed.

use super::client::TcpClient;
use super::connection::OnMessage;
use dashmap::DashMap;
use netcore::endpoint::Endpoint;
use netcore::options::TcpOptions;
use netcore::reactor_pool::ReactorPool;
use netproto::codec::MessageCodec;
use std::sync::Arc;

pub struct TcpClientList {
    clients: DashMap<Endpoint, Arc<TcpClient>>,
    options: TcpOptions,
    codec: Arc<MessageCodec>,
    on_message: OnMessage,
    reactor: Arc<ReactorPool>,
}

impl TcpClientList {
    #[must_use]
    pub fn new(options: TcpOptions, codec: Arc<MessageCodec>, on_message: OnMessage, reactor: Arc<ReactorPool>) -> Arc<Self> {
        Arc::new(Self {
            clients: DashMap::new(),
            options,
            codec,
            on_message,
            reactor,
        })
    }

    fn find_or_create(self: &Arc<Self>, server: &Endpoint) -> Arc<TcpClient> {
        if let Some(client) = self.clients.get(server) {
            return client.clone();
        }
        self.clients
            .entry(server.clone())
            .or_insert_with(|| TcpClient::new(server.clone(), self.options, self.codec.clone(), self.on_message.clone(), self.reactor.clone()))
            .clone()
    }

    #[must_use]
    pub fn send_async(self: &Arc<Self>, server: &Endpoint, bytes: &[u8]) -> bool {
        self.find_or_create(server).send_async(bytes)
    }

    #[must_use]
    pub fn send_sync(self: &Arc<Self>, server: &Endpoint, bytes: &[u8]) -> bool {
        self.find_or_create(server).send_sync(bytes)
    }

    pub fn close_connection(&self, server: &Endpoint) {
        if let Some((_, client)) = self.clients.remove(server) {
            client.close();
        }
    }

    pub fn close_connections(&self) {
        for entry in self.clients.iter() {
            entry.value().close();
        }
    }

    pub fn clear_connections(&self) {
        let clients: Vec<_> = self.clients.iter().map(|e| e.value().clone()).collect();
        self.clients.clear();
        for client in clients {
            client.close();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
