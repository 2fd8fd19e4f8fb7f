//! Errors raised while framing, (de)serializing, or dispatching messages.

use thiserror::Error;

/// Errors surfaced by `netproto`'s header framing and codec layer.
#[derive(Error, Debug)]
pub enum ProtoError {
    /// `bytes_left_to_read` was invoked with fewer than `HEADER_LEN` bytes
    /// accumulated.
    #[error("length error: fewer than {0} header bytes accumulated")]
    Length(usize),

    /// The accumulated prefix's magic string didn't match the codec's
    /// configured magic string.
    #[error("magic string mismatch")]
    MagicMismatch,

    /// `total_length` in the header was smaller than the bytes already
    /// accumulated -- the peer is lying about frame size.
    #[error("total_length {total_length} is smaller than {accumulated} accumulated bytes")]
    LengthMismatch { total_length: u32, accumulated: usize },

    /// The archive_type tag byte didn't match a known variant.
    #[error("unknown archive type tag: {0}")]
    UnknownArchiveType(u8),

    /// A string header field (`magic_string`/`response_address`) had no
    /// interior NUL terminator within its fixed width.
    #[error("string field missing NUL terminator")]
    MissingNulTerminator,

    /// A string header field decoded to non-ASCII/non-UTF8 bytes.
    #[error("string field is not valid ASCII")]
    NonAsciiField,

    /// A string supplied to `MessageHeader::new`/`fill_header` is too long
    /// to fit (with its terminating NUL) in its fixed-width field.
    #[error("field too long to fit its 16-byte slot: {0:?}")]
    FieldTooLong(String),

    /// `response_address` decoded to bytes that aren't a valid IPv4
    /// dotted-quad literal.
    #[error("invalid response address: {0:?}")]
    InvalidResponseAddress(String),

    /// No codec is registered for the header's `archive_type`, or the
    /// registered codec failed to deserialize the body.
    #[error("deserialization failed for archive type {0:?}")]
    DeserializationFailed(crate::header::ArchiveType),

    /// `build` was asked for a non-raw archive type with an empty body.
    #[error("archive type error: empty body for non-raw archive type")]
    EmptyBodyForArchive,

    /// Underlying (de)serialization library error, wrapped opaquely.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Result alias for `netproto` operations.
pub type Result<T> = std::result::Result<T, ProtoError>;
