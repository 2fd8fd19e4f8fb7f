//! `MulticastReceiver`: joins a multicast group on a chosen interface and
//! frames incoming datagrams through the shared UDP receive loop.

use crate::tcp::connection::OnMessage;
use crate::udp::receiver::receive_loop;
use netcore::endpoint::Endpoint;
use netcore::reactor_pool::ReactorPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use netproto::codec::MessageCodec;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

pub struct MulticastReceiver {
    local: Endpoint,
    destructing: Arc<Mutex<bool>>,
    closed_event: Arc<SyncEvent>,
}

impl MulticastReceiver {
    /// `interface`: address of the NIC to join on, or `None` to let the OS
    /// pick (joins on `0.0.0.0`).
    pub fn join(
        listen_addr: Ipv4Addr,
        listen_port: u16,
        group: Ipv4Addr,
        interface: Option<Ipv4Addr>,
        codec: Arc<MessageCodec>,
        on_message: OnMessage,
        reactor: Arc<ReactorPool>,
    ) -> io::Result<Arc<Self>> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddrV4::new(listen_addr, listen_port).into())?;
        let join_iface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&group, &join_iface)?;
        socket.set_nonblocking(true)?;

        let local = socket.local_addr()?.as_socket_ipv4().map(Endpoint::from).unwrap_or_else(|| Endpoint::new(listen_addr, listen_port));

        let std_socket: std::net::UdpSocket = socket.into();
        let udp_socket = compio::net::UdpSocket::from_std(std_socket)?;

        let destructing = Arc::new(Mutex::new(false));
        let closed_event = Arc::new(SyncEvent::new(NotifyPolicy::All, ResetPolicy::Manual, false));

        let this = Arc::new(Self {
            local,
            destructing: destructing.clone(),
            closed_event: closed_event.clone(),
        });

        reactor.post(receive_loop(udp_socket, codec, on_message, destructing, closed_event));

        Ok(this)
    }

    #[must_use]
    pub fn local_endpoint(&self) -> Endpoint {
        self.local.clone()
    }
}

impl Drop for MulticastReceiver {
    fn drop(&mut self) {
        *self.destructing.lock() = true;
    }
}
