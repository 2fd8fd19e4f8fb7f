//! `UdpReceiver`: binds a UDP socket and frames incoming datagrams through
//! the same [`MessageCodec`] contract TCP connections use.

use crate::tcp::connection::OnMessage;
use bytes::BytesMut;
use compio::net::UdpSocket;
use netcore::endpoint::Endpoint;
use netcore::options::UdpOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
use netcore::options::UdpSendMode;
use netproto::codec::MessageCodec;
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tracing::{debug, warn};

/// One UDP datagram can carry at most this many bytes of payload.
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// Binds a UDP socket and delivers framed messages to `on_message` as they
/// arrive. Dropping a `UdpReceiver` sets a destruction flag that its
/// in-flight completion handler checks before touching any callback, to
/// resolve the race between teardown and a receive already in progress.
pub struct UdpReceiver {
    local: Endpoint,
    destructing: Arc<Mutex<bool>>,
    closed_event: Arc<SyncEvent>,
}

impl UdpReceiver {
    /// Bind to `port` on all interfaces. `options.mode == Broadcast` sets
    /// `SO_REUSEADDR` so multiple broadcast listeners can share the port.
    pub fn bind(port: u16, options: UdpOptions, codec: Arc<MessageCodec>, on_message: OnMessage, reactor: Arc<ReactorPool>) -> io::Result<Arc<Self>> {
        let reuse_address = matches!(options.mode, UdpSendMode::Broadcast);
        let std_socket = netcore::udp::bind_udp_socket(
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port),
            reuse_address,
            false,
            options.receive_buffer_size,
        )?;
        let local_addr = std_socket.local_addr()?;
        let SocketAddr::V4(local_v4) = local_addr else {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "non-ipv4 local address"));
        };
        let socket = UdpSocket::from_std(std_socket)?;

        let destructing = Arc::new(Mutex::new(false));
        let closed_event = Arc::new(SyncEvent::new(NotifyPolicy::All, ResetPolicy::Manual, false));

        let this = Arc::new(Self {
            local: local_v4.into(),
            destructing: destructing.clone(),
            closed_event: closed_event.clone(),
        });

        reactor.post(receive_loop(socket, codec, on_message, destructing, closed_event));

        Ok(this)
    }

    #[must_use]
    pub fn local_endpoint(&self) -> Endpoint {
        self.local.clone()
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        // There's no way to cancel an in-flight `recv_from`, so we only
        // flip the flag here; the background task notices it on its next
        // completion (immediately, if one is already in flight) and exits
        // without dispatching further callbacks. `closed_event` lets a
        // caller that wants to block for full teardown do so explicitly.
        *self.destructing.lock() = true;
    }
}

/// Shared by [`UdpReceiver`] and `MulticastReceiver`: accumulate datagrams
/// through the codec's framing contract until a full message is ready,
/// dispatch it, and repeat -- checking `destructing` before every dispatch.
pub(crate) async fn receive_loop(
    socket: UdpSocket,
    codec: Arc<MessageCodec>,
    on_message: OnMessage,
    destructing: Arc<Mutex<bool>>,
    closed_event: Arc<SyncEvent>,
) {
    let mut accumulator = BytesMut::new();
    loop {
        let buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let compio::buf::BufResult(res, buf) = socket.recv_from(buf).await;

        // Observe the destruction flag before touching any callback.
        if *destructing.lock() {
            break;
        }

        match res {
            Ok((n, _from)) => {
                accumulator.extend_from_slice(&buf[..n]);
                match codec.bytes_left_to_read(&accumulator) {
                    Ok(0) => {
                        let frame = accumulator.split().freeze();
                        match codec.on_message(frame) {
                            Ok(msg) => on_message(msg),
                            Err(e) => debug!(error = %e, "dropping malformed udp frame"),
                        }
                        accumulator.clear();
                    }
                    Ok(_) => {
                        // A single datagram didn't carry a full frame; wait
                        // for the rest (atypical for UDP, but the framing
                        // contract is shared with TCP).
                    }
                    Err(e) => {
                        debug!(error = %e, "udp framing error; resetting accumulator");
                        accumulator.clear();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "udp receive failed");
                break;
            }
        }
    }
    closed_event.signal();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_datagram_size_matches_spec() {
        assert_eq!(MAX_DATAGRAM_SIZE, 65507);
    }
}
