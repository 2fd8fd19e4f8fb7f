//! # netapp
//!
//! TCP/UDP/multicast transports for the async networking core, built on
//! `io_uring` via `compio`.
//!
//! ## Architecture
//!
//! - **`netcore`**: runtime-agnostic primitives -- sync/queue/worker/reactor
//!   building blocks, send-buffer pooling, endpoint addressing.
//! - **`netproto`**: sans-IO wire protocol -- the fixed `MessageHeader` and
//!   `MessageCodec`'s framing/(de)serialization contract.
//! - **`netapp`** (this crate): owns the sockets. TCP connections, a
//!   connection registry, server/client facades, and UDP/multicast
//!   sender/receiver pairs, all framed through `netproto::codec::MessageCodec`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use netapp::tcp::TcpServer;
//! use netapp::facade::MessageDispatcher;
//! use netcore::options::TcpOptions;
//! use netcore::reactor_pool::ReactorPool;
//! use netcore::worker::WorkerDestroyPolicy;
//! use netproto::codec::MessageCodec;
//! use std::net::Ipv4Addr;
//! use std::sync::Arc;
//!
//! let reactor = Arc::new(ReactorPool::new(2));
//! let codec = Arc::new(MessageCodec::new("_BEGIN_MESSAGE_", Ipv4Addr::UNSPECIFIED, 22222).unwrap());
//! let dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
//! let server = TcpServer::new(TcpOptions::default(), codec, dispatcher.on_message(), reactor);
//! let _ = server.bind("0.0.0.0:22222".parse().unwrap());
//! ```
//!
//! ## Safety
//!
//! `unsafe` is isolated to `netcore::tcp` (raw-fd socket option/split
//! helpers); everything in this crate is safe Rust.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::future_not_send)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub use bytes::Bytes;

pub mod facade;
pub mod multicast;
pub mod tcp;
pub mod udp;

/// Development helper: initialize tracing when `RUST_LOG` is set.
pub mod dev_tracing;

/// Convenience re-exports for application code wiring transports together.
pub mod prelude {
    pub use crate::facade::MessageDispatcher;
    pub use crate::multicast::{MulticastReceiver, MulticastSender};
    pub use crate::tcp::{ConnectionState, OnMessage, TcpClient, TcpClientList, TcpConnection, TcpConnectionRegistry, TcpServer};
    pub use crate::udp::{UdpReceiver, UdpSender, MAX_DATAGRAM_SIZE};
    pub use netcore::prelude::*;
    pub use netproto::prelude::*;
}
