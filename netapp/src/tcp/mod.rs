//! TCP transport: connections, the registry they're tracked in, and the
//! server/client facades built on top of them.

pub mod client;
pub mod client_list;
pub mod connection;
pub mod registry;
pub mod server;

pub use client::TcpClient;
pub use client_list::TcpClientList;
pub use connection::{ConnectionState, OnMessage, TcpConnection};
pub use registry::TcpConnectionRegistry;
pub use server::TcpServer;
