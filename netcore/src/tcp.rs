//! TCP utilities for high-performance networking.
//!
//! This module provides generic TCP optimizations that are protocol-agnostic.
//!
//! # Safety
//!
//! This module uses unsafe code to access raw file descriptors/sockets for
//! TCP socket configuration. The unsafe operations are encapsulated and safe
//! to use from the public API.

#![allow(unsafe_code)]

use std::io;

/// Enable TCP_NODELAY on a compio TcpStream for minimal latency.
///
/// This disables Nagle's algorithm, trading bandwidth efficiency for lower latency.
/// Essential for request-reply patterns and real-time messaging.
///
/// # Platform Support
///
/// Supported on Unix (Linux, macOS) and Windows platforms.
///
/// # Errors
///
/// Returns an error if the socket option cannot be set.
#[inline]
pub fn enable_tcp_nodelay(stream: &compio::net::TcpStream) -> io::Result<()> {
    set_tcp_nodelay(stream, true)
}

/// Toggle TCP_NODELAY (Nagle's algorithm) on a compio `TcpStream`.
///
/// `nodelay = true` disables Nagle (lower latency, more small packets);
/// `nodelay = false` leaves Nagle enabled (the OS default).
///
/// # Errors
///
/// Returns an error if the socket option cannot be set.
#[inline]
pub fn set_tcp_nodelay(stream: &compio::net::TcpStream, nodelay: bool) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let fd = stream.as_raw_fd();
        let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
        sock.set_nodelay(nodelay)?;
        std::mem::forget(sock); // Don't close the fd
        Ok(())
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let raw = stream.as_raw_socket();
        let sock = unsafe { socket2::Socket::from_raw_socket(raw) };
        sock.set_nodelay(nodelay)?;
        std::mem::forget(sock); // Don't close the socket
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = nodelay;
        Ok(())
    }
}

/// Split a connected `TcpStream` into an independent read half and write
/// half backed by the same socket, so a connection's read loop and write
/// strand can each own a handle without contending for `&mut` access.
///
/// The write half is a `dup`'d file descriptor wrapped back into a
/// `compio::net::TcpStream`; both halves see the same kernel-level socket,
/// so a half-close or error on one is visible on the other.
///
/// # Errors
///
/// Returns an error if the descriptor can't be duplicated, or on platforms
/// without a Unix/Windows raw-handle story.
pub fn split_tcp_stream(stream: compio::net::TcpStream) -> io::Result<(compio::net::TcpStream, compio::net::TcpStream)> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let fd = stream.as_raw_fd();
        let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
        let cloned = sock.try_clone()?;
        std::mem::forget(sock); // the original TcpStream still owns `fd`
        let write_half = compio::net::TcpStream::from_std(cloned.into())?;
        Ok((stream, write_half))
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let raw = stream.as_raw_socket();
        let sock = unsafe { socket2::Socket::from_raw_socket(raw) };
        let cloned = sock.try_clone()?;
        std::mem::forget(sock);
        let write_half = compio::net::TcpStream::from_std(cloned.into())?;
        Ok((stream, write_half))
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = stream;
        Err(io::Error::new(io::ErrorKind::Unsupported, "stream splitting unsupported on this platform"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_yields_two_independent_handles() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let listener = compio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let accept_task = compio::runtime::spawn(async move { listener.accept().await });
            let client = compio::net::TcpStream::connect(addr).await.unwrap();
            let (server, _) = accept_task.await.unwrap().unwrap();

            let (read_half, write_half) = split_tcp_stream(client).unwrap();
            assert!(read_half.peer_addr().is_ok());
            assert!(write_half.peer_addr().is_ok());
            drop(server);
        });
    }
}
