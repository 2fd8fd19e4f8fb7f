//! Wire protocol for the async networking core.
//!
//! Every frame on the wire is a fixed [`header::MessageHeader`] followed by
//! `total_length - HEADER_LEN` bytes of codec-specific body. [`codec::MessageCodec`]
//! fills headers, drives the read-loop framing predicate, and dispatches
//! body (de)serialization to the codec registered for the header's
//! `archive_type`.
//!
//! This crate is sans-IO: it never touches a socket directly. `netapp`'s
//! transports own the sockets and feed accumulated bytes through
//! [`codec::MessageCodec::bytes_left_to_read`]/[`codec::MessageCodec::on_message`].

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod codec;
pub mod error;
pub mod header;
pub mod message;

pub mod prelude {
    pub use crate::codec::{BincodeCodec, BodyCodec, JsonCodec, MessageCodec};
    pub use crate::error::{ProtoError, Result};
    pub use crate::header::{ArchiveType, MessageHeader, DEFAULT_MAGIC_STRING, HEADER_LEN};
    pub use crate::message::ReceivedMessage;
}
