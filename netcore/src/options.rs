//! Socket configuration options for the TCP, UDP, and multicast transports.

use std::time::Duration;

/// Multicast TTL presets, mirroring the conventional scope values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticastTtl {
    /// Packets never leave the sending host.
    SameHost,
    /// Packets stay within the local subnet.
    SameSubnet,
    /// Packets stay within the local site.
    SameSite,
    /// Packets stay within the local region.
    SameRegion,
    /// Packets stay within the local continent.
    SameContinent,
    /// No TTL restriction.
    Unrestricted,
    /// An explicit TTL value not covered by the named presets.
    Custom(u32),
}

impl MulticastTtl {
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::SameHost => 0,
            Self::SameSubnet => 1,
            Self::SameSite => 32,
            Self::SameRegion => 64,
            Self::SameContinent => 128,
            Self::Unrestricted => 255,
            Self::Custom(v) => v,
        }
    }
}

/// Whether Nagle's algorithm (TCP_NODELAY's inverse) is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NagleOption {
    /// Nagle enabled: the OS may coalesce small writes, trading latency for
    /// throughput.
    On,
    /// Nagle disabled (TCP_NODELAY set): writes go out immediately.
    Off,
}

impl NagleOption {
    #[must_use]
    pub const fn nodelay(self) -> bool {
        matches!(self, Self::Off)
    }
}

/// Configuration for a [`crate::sendpool::SendBufferPool`].
#[derive(Debug, Clone, Copy)]
pub struct SendBufferPoolOptions {
    /// Number of pre-reserved buffer slots. `0` bypasses the fixed pool and
    /// falls back to per-send allocation bounded only by
    /// `max_allowed_unsent_async`.
    pub mem_pool_msg_count: usize,
    /// Bytes pre-reserved per pooled buffer.
    pub buffer_capacity: usize,
    /// Cap on buffers checked out but not yet acknowledged.
    pub max_allowed_unsent_async: usize,
}

impl Default for SendBufferPoolOptions {
    fn default() -> Self {
        Self {
            mem_pool_msg_count: 16,
            buffer_capacity: 4096,
            max_allowed_unsent_async: 64,
        }
    }
}

/// Per-[`TcpConnection`](crate) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TcpOptions {
    /// Smallest chunk the read loop ever asks for; equal to the wire
    /// header's fixed size.
    pub min_amount_to_read: usize,
    /// Nagle on/off, applied right after connect succeeds.
    pub nagle: NagleOption,
    /// Hard timeout on the async connect attempt.
    pub connect_timeout: Duration,
    /// Send-buffer pool sizing.
    pub send_buffer_pool: SendBufferPoolOptions,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            min_amount_to_read: 43,
            nagle: NagleOption::Off,
            connect_timeout: Duration::from_secs(15),
            send_buffer_pool: SendBufferPoolOptions::default(),
        }
    }
}

/// Whether a UDP socket is used for unicast or broadcast delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpSendMode {
    /// Point-to-point; no special socket options.
    Unicast,
    /// Sets SO_BROADCAST on the sender and enables address reuse on the
    /// receiver.
    Broadcast,
}

/// Per-`UdpReceiver`/`UdpSender` configuration.
#[derive(Debug, Clone, Copy)]
pub struct UdpOptions {
    pub mode: UdpSendMode,
    /// SO_RCVBUF size hint for the receiver, if set.
    pub receive_buffer_size: Option<usize>,
}

impl Default for UdpOptions {
    fn default() -> Self {
        Self {
            mode: UdpSendMode::Unicast,
            receive_buffer_size: Some(8192),
        }
    }
}

/// Per-`MulticastReceiver`/`MulticastSender` configuration.
#[derive(Debug, Clone, Copy)]
pub struct MulticastOptions {
    pub ttl: MulticastTtl,
    /// Whether packets sent from this host are looped back to local
    /// receivers in the same group.
    pub loopback: bool,
}

impl Default for MulticastOptions {
    fn default() -> Self {
        Self {
            ttl: MulticastTtl::SameSubnet,
            loopback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_presets_match_spec_values() {
        assert_eq!(MulticastTtl::SameHost.as_u32(), 0);
        assert_eq!(MulticastTtl::SameSubnet.as_u32(), 1);
        assert_eq!(MulticastTtl::SameSite.as_u32(), 32);
        assert_eq!(MulticastTtl::SameRegion.as_u32(), 64);
        assert_eq!(MulticastTtl::SameContinent.as_u32(), 128);
        assert_eq!(MulticastTtl::Unrestricted.as_u32(), 255);
        assert_eq!(MulticastTtl::Custom(17).as_u32(), 17);
    }

    #[test]
    fn nagle_off_means_nodelay() {
        assert!(NagleOption::Off.nodelay());
        assert!(!NagleOption::On.nodelay());
    }

    #[test]
    fn tcp_options_default_matches_header_size() {
        let opts = TcpOptions::default();
        assert_eq!(opts.min_amount_to_read, 43);
        assert_eq!(opts.connect_timeout, Duration::from_secs(15));
    }
}
