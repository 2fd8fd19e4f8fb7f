//! UDP socket construction shared by the UDP and multicast transports.
//!
//! # Safety
//!
//! Like [`crate::tcp`], this builds a `socket2::Socket` from scratch and
//! hands it back as the raw ingredients (`std::net::UdpSocket`) for a
//! runtime-native socket; no unsafe raw-fd aliasing is needed here since the
//! socket is never duplicated.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Build and bind a UDP socket with the options common to unicast,
/// broadcast, and multicast sockets.
///
/// `reuse_address` is set before `bind` (as the OS requires). `broadcast`
/// enables `SO_BROADCAST`. `recv_buffer_size` sets `SO_RCVBUF` when given.
pub fn bind_udp_socket(
    bind_addr: SocketAddrV4,
    reuse_address: bool,
    broadcast: bool,
    recv_buffer_size: Option<usize>,
) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    if reuse_address {
        socket.set_reuse_address(true)?;
    }
    if broadcast {
        socket.set_broadcast(true)?;
    }
    if let Some(size) = recv_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// An ephemeral-port UDP socket for sending only (no bind address needed
/// beyond "any port").
pub fn ephemeral_udp_socket(broadcast: bool) -> io::Result<std::net::UdpSocket> {
    bind_udp_socket(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0), false, broadcast, None)
}
