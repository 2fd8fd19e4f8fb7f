//! `MessageCodec`: fills headers, frames reads off the wire, and
//! (de)serializes bodies through the codec registered for a message's
//! `archive_type`.

use crate::error::{ProtoError, Result};
use crate::header::{ArchiveType, MessageHeader, HEADER_LEN};
use crate::message::ReceivedMessage;
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::Ipv4Addr;

/// Serializes/deserializes a message body for one `archive_type`.
///
/// `archive_type` is a closed, 5-variant enum on the wire, so `MessageCodec`
/// dispatches to one of these directly rather than through a runtime
/// registry of type-erased codecs.
pub trait BodyCodec {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T>;
}

/// `portableBinary`/`binary`: `bincode`'s compact binary format. The spec
/// doesn't distinguish the two at the wire level beyond the tag value, so
/// both route here.
pub struct BincodeCodec;

impl BodyCodec for BincodeCodec {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| ProtoError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| ProtoError::Codec(e.to_string()))
    }
}

/// `text`/`xml`: `serde_json` stands in for both. There is no XML crate in
/// this stack, so `xml`-tagged bodies round-trip through JSON under the
/// hood; see `DESIGN.md`.
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| ProtoError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| ProtoError::Codec(e.to_string()))
    }
}

/// Configuration shared by every header this codec fills and validates.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    magic_string: String,
    /// Used as `response_address`/`response_port` when the caller passes
    /// the null endpoint to `fill_header`.
    fallback_address: Ipv4Addr,
    fallback_port: u16,
}

impl MessageCodec {
    /// `magic_string` must fit in the header's 16-byte field (so at most 15
    /// ASCII bytes, leaving room for the NUL terminator).
    pub fn new(magic_string: impl Into<String>, fallback_address: Ipv4Addr, fallback_port: u16) -> Result<Self> {
        let magic_string = magic_string.into();
        if !magic_string.is_ascii() || magic_string.len() >= 16 {
            return Err(ProtoError::FieldTooLong(magic_string));
        }
        Ok(Self {
            magic_string,
            fallback_address,
            fallback_port,
        })
    }

    #[must_use]
    pub fn magic_string(&self) -> &str {
        &self.magic_string
    }

    /// Build a header for `message_id`/`archive_type`, substituting this
    /// codec's fallback endpoint when `response_address`/`response_port`
    /// are the null endpoint (`0.0.0.0:0`).
    pub fn fill_header(
        &self,
        message_id: u32,
        archive_type: ArchiveType,
        response_address: Ipv4Addr,
        response_port: u16,
        total_length: u32,
    ) -> Result<MessageHeader> {
        let (address, port) = if response_address.is_unspecified() && response_port == 0 {
            (self.fallback_address, self.fallback_port)
        } else {
            (response_address, response_port)
        };
        MessageHeader::new(&self.magic_string, address, port, message_id, archive_type, total_length)
    }

    /// How many more bytes the read loop needs before the frame is
    /// complete; `0` means the frame in `accumulated` is ready for
    /// `on_message`.
    ///
    /// # Errors
    /// Fails with [`ProtoError::Length`] if fewer than `HEADER_LEN` bytes
    /// are accumulated, with [`ProtoError::MagicMismatch`] if the header's
    /// magic string doesn't match this codec's, and with
    /// [`ProtoError::LengthMismatch`] if the header's `total_length` is
    /// smaller than what's already accumulated.
    pub fn bytes_left_to_read(&self, accumulated: &[u8]) -> Result<usize> {
        if accumulated.len() < HEADER_LEN {
            return Err(ProtoError::Length(HEADER_LEN));
        }
        let header = MessageHeader::decode(&accumulated[..HEADER_LEN])?;
        if header.magic_string != self.magic_string {
            return Err(ProtoError::MagicMismatch);
        }
        let total_length = header.total_length as usize;
        if total_length < accumulated.len() {
            return Err(ProtoError::LengthMismatch {
                total_length: header.total_length,
                accumulated: accumulated.len(),
            });
        }
        Ok(total_length - accumulated.len())
    }

    /// Split a complete frame into a [`ReceivedMessage`] once
    /// `bytes_left_to_read` has returned `0` for it.
    pub fn on_message(&self, frame: Bytes) -> Result<ReceivedMessage> {
        if frame.len() < HEADER_LEN {
            return Err(ProtoError::Length(HEADER_LEN));
        }
        let header = MessageHeader::decode(&frame[..HEADER_LEN])?;
        if header.magic_string != self.magic_string {
            return Err(ProtoError::MagicMismatch);
        }
        let total_length = header.total_length as usize;
        if total_length != frame.len() {
            return Err(ProtoError::LengthMismatch {
                total_length: header.total_length,
                accumulated: frame.len(),
            });
        }
        let body = frame.slice(HEADER_LEN..total_length);
        Ok(ReceivedMessage::new(header, body))
    }

    /// Build a header-only frame (no body).
    pub fn build_header_only(
        &self,
        message_id: u32,
        archive_type: ArchiveType,
        response_address: Ipv4Addr,
        response_port: u16,
    ) -> Result<Vec<u8>> {
        let header = self.fill_header(
            message_id,
            archive_type,
            response_address,
            response_port,
            HEADER_LEN as u32,
        )?;
        let mut out = BytesMut::with_capacity(HEADER_LEN);
        header.encode(&mut out)?;
        Ok(out.to_vec())
    }

    /// Serialize `body` with the codec for `archive_type` and frame it
    /// behind a header. Fails with [`ProtoError::EmptyBodyForArchive`] if
    /// the serialized body is empty and `archive_type` isn't `raw`.
    pub fn build<T: Serialize>(
        &self,
        message_id: u32,
        archive_type: ArchiveType,
        response_address: Ipv4Addr,
        response_port: u16,
        body: &T,
    ) -> Result<Vec<u8>> {
        let encoded = match archive_type {
            ArchiveType::PortableBinary | ArchiveType::Binary => BincodeCodec::encode(body)?,
            ArchiveType::Text | ArchiveType::Xml => JsonCodec::encode(body)?,
            ArchiveType::Raw => bincode::serialize(body).map_err(|e| ProtoError::Codec(e.to_string()))?,
        };
        if encoded.is_empty() && !matches!(archive_type, ArchiveType::Raw) {
            return Err(ProtoError::EmptyBodyForArchive);
        }

        let total_length = (HEADER_LEN + encoded.len()) as u32;
        let header = self.fill_header(message_id, archive_type, response_address, response_port, total_length)?;

        let mut out = BytesMut::with_capacity(total_length as usize);
        header.encode(&mut out)?;
        out.extend_from_slice(&encoded);
        Ok(out.to_vec())
    }

    /// Build a frame from an already-serialized raw byte body (the "raw"
    /// POD passthrough path: the caller owns the in-memory layout).
    pub fn build_raw(
        &self,
        message_id: u32,
        response_address: Ipv4Addr,
        response_port: u16,
        raw_body: &[u8],
    ) -> Result<Vec<u8>> {
        let total_length = (HEADER_LEN + raw_body.len()) as u32;
        let header = self.fill_header(
            message_id,
            ArchiveType::Raw,
            response_address,
            response_port,
            total_length,
        )?;
        let mut out = BytesMut::with_capacity(total_length as usize);
        header.encode(&mut out)?;
        out.extend_from_slice(raw_body);
        Ok(out.to_vec())
    }

    /// Deserialize `message.body` using the codec for its header's
    /// `archive_type`.
    pub fn deserialize<T: DeserializeOwned>(&self, message: &ReceivedMessage) -> Result<T> {
        match message.header.archive_type {
            ArchiveType::PortableBinary | ArchiveType::Binary => BincodeCodec::decode(&message.body),
            ArchiveType::Text | ArchiveType::Xml => JsonCodec::decode(&message.body),
            ArchiveType::Raw => bincode::deserialize(&message.body).map_err(|e| ProtoError::Codec(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        data: Vec<f64>,
    }

    fn codec() -> MessageCodec {
        MessageCodec::new("_BEGIN_MESSAGE_", Ipv4Addr::new(10, 0, 0, 1), 9000).unwrap()
    }

    #[test]
    fn build_then_on_message_round_trips_binary() {
        let codec = codec();
        let body = Sample {
            name: "X".into(),
            data: vec![1.0, 2.0],
        };
        let frame = codec
            .build(666, ArchiveType::PortableBinary, Ipv4Addr::UNSPECIFIED, 0, &body)
            .unwrap();

        let left = codec.bytes_left_to_read(&frame[..HEADER_LEN]).unwrap();
        assert_eq!(left, frame.len() - HEADER_LEN);

        let msg = codec.on_message(Bytes::from(frame)).unwrap();
        assert_eq!(msg.message_id(), 666);
        assert_eq!(msg.header.response_address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(msg.header.response_port, 9000);

        let decoded: Sample = codec.deserialize(&msg).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn header_only_message_has_empty_body() {
        let codec = codec();
        let frame = codec
            .build_header_only(42, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0)
            .unwrap();
        assert_eq!(frame.len(), HEADER_LEN);

        let msg = codec.on_message(Bytes::from(frame)).unwrap();
        assert!(msg.is_header_only());
    }

    #[test]
    fn bytes_left_to_read_fails_under_header_len() {
        let codec = codec();
        assert!(matches!(
            codec.bytes_left_to_read(&[0u8; 10]),
            Err(ProtoError::Length(_))
        ));
    }

    #[test]
    fn wrong_magic_string_is_rejected() {
        let codec = codec();
        let other = MessageCodec::new("_OTHER_MAGIC__", Ipv4Addr::UNSPECIFIED, 0).unwrap();
        let frame = other
            .build_header_only(1, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0)
            .unwrap();
        assert!(matches!(
            codec.bytes_left_to_read(&frame),
            Err(ProtoError::MagicMismatch)
        ));
    }

    #[test]
    fn total_length_smaller_than_accumulated_is_length_mismatch() {
        let codec = codec();
        let mut frame = codec
            .build_header_only(1, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0)
            .unwrap();
        frame.extend_from_slice(b"extra");
        let err = codec.bytes_left_to_read(&frame[..HEADER_LEN]);
        // total_length in the header says HEADER_LEN, but we accumulated
        // more than that by appending "extra" before re-slicing to
        // HEADER_LEN only -- exercise the mismatch on the raw frame instead.
        assert!(err.is_ok());
        assert!(matches!(
            codec.bytes_left_to_read(&frame),
            Err(ProtoError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn raw_body_round_trips_byte_for_byte() {
        let codec = codec();
        let raw_bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let frame = codec
            .build_raw(7, Ipv4Addr::UNSPECIFIED, 0, &raw_bytes)
            .unwrap();
        let msg = codec.on_message(Bytes::from(frame)).unwrap();
        assert_eq!(&msg.body[..], &raw_bytes);
    }
}
