//! `MulticastSender`: sends framed datagrams to a multicast group with
//! configured TTL scope, loopback, and outbound interface.

use netcore::endpoint::Endpoint;
use netcore::options::MulticastOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tracing::debug;

pub struct MulticastSender {
    target: SocketAddr,
    socket: Arc<compio::net::UdpSocket>,
    reactor: Arc<ReactorPool>,
}

impl MulticastSender {
    /// `outbound_interface`: address of the NIC to send from, or `None` to
    /// let the OS pick.
    pub fn new(group: Endpoint, options: MulticastOptions, outbound_interface: Option<Ipv4Addr>, reactor: Arc<ReactorPool>) -> io::Result<Arc<Self>> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_multicast_ttl_v4(options.ttl.as_u32())?;
        socket.set_multicast_loop_v4(options.loopback)?;
        if let Some(iface) = outbound_interface {
            socket.set_multicast_if_v4(&iface)?;
        }
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let udp_socket = compio::net::UdpSocket::from_std(std_socket)?;

        Ok(Arc::new(Self {
            target: group.to_socket_addr(),
            socket: Arc::new(udp_socket),
            reactor,
        }))
    }

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
                debug!(error = %e, "multicast send_to failed");
            }
            *ok2.lock() = res.is_ok();
            done2.signal();
        });

        done.wait();
        *ok.lock()
    }
}
