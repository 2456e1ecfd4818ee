//! Error types for the client layer.

use mulink_protocol::CodecError;

/// Errors that can occur while calling or subscribing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a status other than `"OK"`.
    #[error("server rejected call: {0}")]
    Permission(String),

    /// The connection closed before the call got its response.
    #[error("connection lost before response")]
    ConnectionLost,

    /// No response arrived within the configured call timeout.
    #[error("call timed out")]
    Timeout,

    /// The pending-call table is full.
    #[error("too many pending calls (limit {0})")]
    TooManyPending(usize),

    /// The pre-open frame queue is full.
    #[error("outbound queue full (limit {0})")]
    QueueFull(usize),

    /// The outbound frame could not be serialized.
    #[error("frame encoding failed: {0}")]
    Encode(String),

    /// Arguments failed a schema check before sending.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The client was closed, or its task is gone.
    #[error("client is shut down")]
    Shutdown,
}
