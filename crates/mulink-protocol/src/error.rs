//! Error types for the protocol layer.
//!
//! Two enums live here. [`CodecError`] covers the typed binary codec
//! (turning values into bytes and back). [`FrameError`] covers the JSON
//! frames that carry those bytes over the connection. Keeping them apart
//! means a caller decoding an event payload never has to match on JSON
//! failures it cannot produce.

use crate::Kind;

/// Errors produced by the typed codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// A textual kind tag did not name any known kind.
    #[error("unknown value kind <{0}>")]
    UnknownKind(String),

    /// The value handed to `encode` cannot be represented as the kind.
    #[error("value does not fit kind {kind}: {reason}")]
    TypeMismatch { kind: Kind, reason: String },

    /// A string (plus its NUL terminator) does not fit a fixed-width slot.
    ///
    /// Encoding never truncates: the caller must shorten the string.
    #[error("string of {len} bytes (with terminator) exceeds {width}-byte slot")]
    StringTooLong { len: usize, width: usize },

    /// There were no bytes to decode.
    #[error("empty payload")]
    Empty,

    /// A generic-framed buffer has a missing or inconsistent length prefix.
    #[error("bad length prefix: declared {declared}, available {available}")]
    BadLengthPrefix { declared: u64, available: usize },

    /// The buffer length is not a whole number of elements of the kind.
    #[error("{len} bytes is not a multiple of the {width}-byte width of {kind}")]
    Misaligned { kind: Kind, len: usize, width: usize },

    /// `unpack` ran out of bytes in the middle of a schema pass.
    #[error("buffer ends mid-record at offset {offset} ({remaining} bytes left)")]
    TrailingBytes { offset: usize, remaining: usize },

    /// `unpack` was given a schema with no kinds in it.
    #[error("unpack schema is empty")]
    EmptySchema,

    /// Call arguments do not agree with the declared argument schema.
    #[error("argument schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Errors produced while building or parsing JSON frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Serializing an outbound frame failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound message was not a frame we understand.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The `args` field of a request is not valid base64.
    #[error("bad base64 arguments: {0}")]
    Args(base64::DecodeError),
}
