//! Unified error type for mulink.

use mulink_client::ClientError;
use mulink_protocol::{CodecError, FrameError};
use mulink_rdb::RdbError;
use mulink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MulinkError {
    /// The URL does not use a `ws://` or `wss://` scheme.
    #[error("invalid server url <{0}>")]
    InvalidUrl(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Rdb(#[from] RdbError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let mulink_err: MulinkError = err.into();
        assert!(matches!(mulink_err, MulinkError::Transport(_)));
        assert!(mulink_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_codec_error() {
        let err = CodecError::UnknownKind("uint128".into());
        let mulink_err: MulinkError = err.into();
        assert!(matches!(mulink_err, MulinkError::Codec(_)));
        assert!(mulink_err.to_string().contains("uint128"));
    }

    #[test]
    fn test_from_client_error() {
        let mulink_err: MulinkError = ClientError::Timeout.into();
        assert!(matches!(mulink_err, MulinkError::Client(ClientError::Timeout)));
    }

    #[test]
    fn test_from_rdb_error() {
        let err = RdbError::WatchRejected("/k".into());
        let mulink_err: MulinkError = err.into();
        assert!(matches!(mulink_err, MulinkError::Rdb(_)));
        assert_eq!(mulink_err.to_string(), "server rejected watch on </k>");
    }
}
