//! `UdpSender`: a fire-and-forget sender to one resolved target endpoint.

use netcore::endpoint::Endpoint;
use netcore::options::{UdpOptions, UdpSendMode};
use netcore::reactor_pool::ReactorPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Opens a UDP socket (optionally with `SO_BROADCAST`) and caches its send
/// target. `send` is synchronous at the API surface but runs the actual
/// `send_to` on the reactor, mirroring `TcpConnection::send_sync`.
pub struct UdpSender {
    target: std::net::SocketAddr,
    socket: Arc<compio::net::UdpSocket>,
    reactor: Arc<ReactorPool>,
}

impl UdpSender {
    pub fn new(target: Endpoint, options: UdpOptions, reactor: Arc<ReactorPool>) -> io::Result<Arc<Self>> {
        let broadcast = matches!(options.mode, UdpSendMode::Broadcast);
        let std_socket = netcore::udp::ephemeral_udp_socket(broadcast)?;
        let socket = compio::net::UdpSocket::from_std(std_socket)?;
        Ok(Arc::new(Self {
            target: target.to_socket_addr(),
            socket: Arc::new(socket),
            reactor,
        }))
    }

    /// Send an already-framed buffer (typically built via `MessageCodec`).
    /// No framing is imposed here. Returns `false` on any OS error.
    #[must_use]
    pub fn send(&self, bytes: &[u8]) -> bool {
        let done = Arc::new(SyncEvent::new(NotifyPolicy::One, ResetPolicy::Manual, false));
        let ok = Arc::new(Mutex::new(false));
        let socket = self.socket.clone();
        let target = self.target;
        let data = bytes.to_vec();

        let done2 = done.clone();
        let ok2 = ok.clone();
        self.reactor.post(async move {
            let compio::buf::BufResult(res, _) = socket.send_to(data, target).await;
            if let Err(e) = &res {
                debug!(error = %e, "udp send_to failed");
            }
            *ok2.lock() = res.is_ok();
            done2.signal();
        });

        done.wait();
        *ok.lock()
    }
}
