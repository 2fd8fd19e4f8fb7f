//! Connectionless UDP transport sharing the TCP transport's framing
//! contract ([`netproto::codec::MessageCodec`]).

pub mod receiver;
pub mod sender;

pub use receiver::{UdpReceiver, MAX_DATAGRAM_SIZE};
pub use sender::UdpSender;
