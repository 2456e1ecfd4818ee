//! Client configuration and connection state.

use std::time::Duration;

use mulink_protocol::DEFAULT_ARGS_CHUNK;
use tracing::warn;

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings for a [`TransportClient`](crate::TransportClient).
///
/// Call [`validated`](Self::validated) (the client does this on spawn) to
/// clamp out-of-range values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Reconnect automatically after a close the caller did not ask for.
    pub reconnect: bool,

    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Upper bound of a random delay added to each reconnect attempt, so a
    /// fleet of clients does not hammer a restarted server in lockstep.
    pub reconnect_jitter: Duration,

    /// Deadline for a call to get its response. `None` waits forever.
    pub call_timeout: Option<Duration>,

    /// Maximum number of calls awaiting a response, queued ones included.
    pub max_pending_calls: usize,

    /// Maximum number of frames buffered while the connection is not open.
    pub max_queued_frames: usize,

    /// Argument bytes base64-encoded per chunk. Kept a multiple of 3.
    pub args_chunk_size: usize,

    /// Re-subscribe to every channel that was live when the connection
    /// dropped, once it opens again.
    pub replay_subscriptions: bool,

    /// Capacity of the handle → actor command channel.
    pub command_buffer: usize,
}

impl ClientConfig {
    /// Smallest accepted base64 chunk.
    pub const MIN_ARGS_CHUNK: usize = 3;

    /// Returns a copy with out-of-range fields clamped.
    pub fn validated(mut self) -> Self {
        if self.max_pending_calls == 0 {
            warn!("max_pending_calls is 0, clamping to 1");
            self.max_pending_calls = 1;
        }
        if self.max_queued_frames == 0 {
            warn!("max_queued_frames is 0, clamping to 1");
            self.max_queued_frames = 1;
        }
        if self.command_buffer == 0 {
            warn!("command_buffer is 0, clamping to 1");
            self.command_buffer = 1;
        }
        let chunk = (self.args_chunk_size / 3 * 3).max(Self::MIN_ARGS_CHUNK);
        if chunk != self.args_chunk_size {
            warn!(
                requested = self.args_chunk_size,
                used = chunk,
                "args_chunk_size must be a multiple of 3, rounding down"
            );
            self.args_chunk_size = chunk;
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_delay: Duration::from_secs(1),
            reconnect_jitter: Duration::from_millis(250),
            call_timeout: Some(Duration::from_secs(30)),
            max_pending_calls: 1024,
            max_queued_frames: 1024,
            args_chunk_size: DEFAULT_ARGS_CHUNK,
            replay_subscriptions: true,
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The lifecycle state of the client's connection.
///
/// ```text
/// Connecting → Open → Closed ─(reconnect delay)→ Connecting → …
///      └──(connect failed)──▶ Closed
/// ```
///
/// - **Connecting**: a connection attempt is in flight. Calls and control
///   frames are queued.
/// - **Open**: frames flow immediately.
/// - **Closed**: no connection. Pending calls were abandoned. Calls are
///   queued if a reconnect is scheduled and rejected otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.reconnect);
        assert!(config.replay_subscriptions);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.call_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.args_chunk_size % 3, 0);
    }

    #[test]
    fn test_default_config_is_already_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_validated_clamps_zero_capacities() {
        let config = ClientConfig {
            max_pending_calls: 0,
            max_queued_frames: 0,
            command_buffer: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.max_pending_calls, 1);
        assert_eq!(config.max_queued_frames, 1);
        assert_eq!(config.command_buffer, 1);
    }

    #[test]
    fn test_validated_rounds_chunk_size_down_to_multiple_of_three() {
        let config = ClientConfig {
            args_chunk_size: 1000,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.args_chunk_size, 999);

        let tiny = ClientConfig {
            args_chunk_size: 1,
            ..Default::default()
        }
        .validated();
        assert_eq!(tiny.args_chunk_size, ClientConfig::MIN_ARGS_CHUNK);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::Open.to_string(), "Open");
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Closed.is_open());
    }
}
