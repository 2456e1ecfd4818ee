//! Error types for the database layer.

use mulink_client::ClientError;
use mulink_protocol::CodecError;

/// Errors that can occur while talking to the runtime database.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RdbError {
    /// The server refused to set up a watch and returned no channel.
    #[error("server rejected watch on <{0}>")]
    WatchRejected(String),

    /// A reply decoded fine but was not the shape the method returns.
    #[error("unexpected reply from {method}: {reason}")]
    UnexpectedReply {
        method: &'static str,
        reason: String,
    },

    /// The underlying call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A key did not fit its slot, or a reply could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
