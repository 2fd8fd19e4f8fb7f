//! The fixed 43-byte `MessageHeader` that precedes every frame on the wire.
//!
//! Field layout is bit-exact and little-endian regardless of host
//! architecture; see [`MessageHeader::encode`]/[`MessageHeader::decode`] for
//! the exact byte offsets.

use crate::error::{ProtoError, Result};
use bytes::{Buf, BufMut, BytesMut};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Size of a fixed string field (`magic_string`, `response_address`).
pub const STRING_FIELD_LEN: usize = 16;

/// Total on-wire size of [`MessageHeader`] in bytes.
pub const HEADER_LEN: usize =
    STRING_FIELD_LEN + STRING_FIELD_LEN + 2 /* port */ + 4 /* id */ + 1 /* archive type */ + 4 /* total_length */;

/// Default magic string stamped into every header unless overridden.
pub const DEFAULT_MAGIC_STRING: &str = "_BEGIN_MESSAGE_";

/// Serialization format tag carried in the header, selecting which
/// registered [`crate::codec::BodyCodec`] decodes the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    PortableBinary = 0,
    Binary = 1,
    Text = 2,
    Xml = 3,
    Raw = 4,
}

impl ArchiveType {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::PortableBinary),
            1 => Ok(Self::Binary),
            2 => Ok(Self::Text),
            3 => Ok(Self::Xml),
            4 => Ok(Self::Raw),
            other => Err(ProtoError::UnknownArchiveType(other)),
        }
    }
}

/// A fixed-size, NUL-terminated ASCII string packed into a header field.
fn encode_fixed_string(s: &str, field_len: usize) -> Result<[u8; STRING_FIELD_LEN]> {
    if field_len != STRING_FIELD_LEN {
        unreachable!("only one fixed string width is used on this wire format");
    }
    if !s.is_ascii() {
        return Err(ProtoError::FieldTooLong(s.to_string()));
    }
    // Must fit with room for the terminating NUL.
    if s.len() >= STRING_FIELD_LEN {
        return Err(ProtoError::FieldTooLong(s.to_string()));
    }
    let mut buf = [0u8; STRING_FIELD_LEN];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    Ok(buf)
}

fn decode_fixed_string(buf: &[u8]) -> Result<String> {
    let nul = buf.iter().position(|&b| b == 0).ok_or(ProtoError::MissingNulTerminator)?;
    std::str::from_utf8(&buf[..nul])
        .map(str::to_string)
        .map_err(|_| ProtoError::NonAsciiField)
}

/// The fixed header every wire frame begins with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic_string: String,
    pub response_address: Ipv4Addr,
    pub response_port: u16,
    pub message_id: u32,
    pub archive_type: ArchiveType,
    pub total_length: u32,
}

impl MessageHeader {
    /// Build a header. Fails if `magic_string` or the textual form of
    /// `response_address` can't fit in their 16-byte fields (i.e. is 16
    /// bytes or longer once rendered as ASCII).
    pub fn new(
        magic_string: &str,
        response_address: Ipv4Addr,
        response_port: u16,
        message_id: u32,
        archive_type: ArchiveType,
        total_length: u32,
    ) -> Result<Self> {
        // Validate up front so callers get the same "field too long" error
        // building the header that `encode` would raise.
        encode_fixed_string(magic_string, STRING_FIELD_LEN)?;
        encode_fixed_string(&response_address.to_string(), STRING_FIELD_LEN)?;
        Ok(Self {
            magic_string: magic_string.to_string(),
            response_address,
            response_port,
            message_id,
            archive_type,
            total_length,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) -> Result<()> {
        let magic = encode_fixed_string(&self.magic_string, STRING_FIELD_LEN)?;
        let addr = encode_fixed_string(&self.response_address.to_string(), STRING_FIELD_LEN)?;
        out.reserve(HEADER_LEN);
        out.put_slice(&magic);
        out.put_slice(&addr);
        out.put_u16_le(self.response_port);
        out.put_u32_le(self.message_id);
        out.put_u8(self.archive_type.tag());
        out.put_u32_le(self.total_length);
        Ok(())
    }

    /// Decode a header from the first [`HEADER_LEN`] bytes of `buf`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`HEADER_LEN`]; callers must check
    /// `bytes_left_to_read`'s length precondition first.
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        assert!(buf.len() >= HEADER_LEN, "caller must ensure HEADER_LEN bytes are present");

        let magic_string = decode_fixed_string(&buf[..STRING_FIELD_LEN])?;
        buf.advance(STRING_FIELD_LEN);

        let addr_str = decode_fixed_string(&buf[..STRING_FIELD_LEN])?;
        let response_address = Ipv4Addr::from_str(&addr_str).map_err(|_| ProtoError::InvalidResponseAddress(addr_str))?;
        buf.advance(STRING_FIELD_LEN);

        let response_port = buf.get_u16_le();
        let message_id = buf.get_u32_le();
        let archive_type = ArchiveType::from_tag(buf.get_u8())?;
        let total_length = buf.get_u32_le();

        Ok(Self {
            magic_string,
            response_address,
            response_port,
            message_id,
            archive_type,
            total_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let header = MessageHeader::new(
            DEFAULT_MAGIC_STRING,
            Ipv4Addr::new(127, 0, 0, 1),
            5050,
            666,
            ArchiveType::Text,
            HEADER_LEN as u32 + 10,
        )
        .unwrap();

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);

        let decoded = MessageHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_magic_string_at_field_width() {
        let too_long = "A".repeat(STRING_FIELD_LEN);
        let err = MessageHeader::new(
            &too_long,
            Ipv4Addr::UNSPECIFIED,
            0,
            0,
            ArchiveType::Raw,
            HEADER_LEN as u32,
        );
        assert!(err.is_err());
    }

    #[test]
    fn header_len_matches_field_table() {
        assert_eq!(HEADER_LEN, 43);
    }

    #[test]
    fn unknown_archive_type_tag_fails() {
        assert!(ArchiveType::from_tag(200).is_err());
    }
}
