//! The message types flowing between the codec and application dispatchers.

use crate::header::MessageHeader;
use bytes::Bytes;

/// A fully-framed message delivered to a dispatcher callback: the header it
/// arrived with plus the raw body bytes (after the header, up to
/// `total_length`).
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub header: MessageHeader,
    pub body: Bytes,
}

impl ReceivedMessage {
    #[must_use]
    pub const fn new(header: MessageHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    #[must_use]
    pub const fn message_id(&self) -> u32 {
        self.header.message_id
    }

    #[must_use]
    pub fn is_header_only(&self) -> bool {
        self.body.is_empty()
    }
}
