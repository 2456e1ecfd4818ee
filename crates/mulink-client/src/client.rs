//! `TransportClient` handle and builder.
//!
//! The handle is a thin wrapper around an `mpsc::Sender`: every operation
//! becomes a [`Command`] processed by the client actor, which owns the
//! connection and all tables. Operations that need an answer carry a
//! `oneshot` reply channel.

use std::sync::Arc;
use std::time::Duration;

use mulink_protocol::{ArgSchema, Framing, TypedValue};
use mulink_transport::Connector;
use tokio::sync::{mpsc, oneshot, watch};

use crate::actor::ClientActor;
use crate::pending::Reply;
use crate::subscriptions::{ConnectionListener, EventCallback};
use crate::{ClientConfig, ClientError, ConnectionState};

/// How the caller wants a call's return bytes interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// The payload as raw native bytes.
    #[default]
    Native,
    /// The payload is length-prefixed (generic framing).
    Generic,
    /// The caller does not want a value. The request says so and the call
    /// resolves with an empty native value once the server acknowledges it.
    None,
}

impl ResponseKind {
    /// Whether the request asks the server for the return value.
    pub fn wants_payload(self) -> bool {
        !matches!(self, ResponseKind::None)
    }

    /// Wraps a successful response payload.
    pub(crate) fn resolve(self, payload: Vec<u8>) -> TypedValue {
        match self {
            ResponseKind::Native => TypedValue::from_bytes(payload, Framing::Native),
            ResponseKind::Generic => TypedValue::from_bytes(payload, Framing::Generic),
            ResponseKind::None => TypedValue::default(),
        }
    }
}

/// Commands sent to the client actor through its channel.
pub(crate) enum Command {
    Call {
        method: String,
        args: Vec<TypedValue>,
        response: ResponseKind,
        reply: Reply,
    },
    Subscribe {
        channel: String,
        callback: EventCallback,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Unsubscribe {
        channel: String,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    OnConnectionChange {
        listener: ConnectionListener,
        reply: oneshot::Sender<()>,
    },
    Info {
        reply: oneshot::Sender<ClientInfo>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// A snapshot of the client's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub state: ConnectionState,
    /// Calls waiting for a response, queued ones included.
    pub pending_calls: usize,
    /// Frames waiting for the connection to open.
    pub queued_frames: usize,
    /// Channels with a live callback.
    pub subscriptions: usize,
}

/// Handle to a running client. Cheap to clone.
///
/// # Example
///
/// ```rust,ignore
/// use mulink_client::{ResponseKind, TransportClient};
/// use mulink_transport::WebSocketConnector;
///
/// let client = TransportClient::builder()
///     .call_timeout(Some(Duration::from_secs(5)))
///     .connect(WebSocketConnector::new("ws://127.0.0.1:5701"));
/// client.wait_open().await?;
/// let name = client
///     .call("mulex::SysGetExperimentName", vec![], ResponseKind::Generic)
///     .await?;
/// ```
#[derive(Clone)]
pub struct TransportClient {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    idle: watch::Receiver<bool>,
}

impl TransportClient {
    /// Spawns a client actor that connects through `connector`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect<C: Connector>(connector: C, config: ClientConfig) -> Self {
        let config = config.validated();
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (idle_tx, idle_rx) = watch::channel(false);

        let actor = ClientActor::new(Arc::new(connector), config, rx, state_tx, idle_tx);
        tokio::spawn(actor.run());

        Self {
            commands: tx,
            state: state_rx,
            idle: idle_rx,
        }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Calls `method` with `args` and waits for its response.
    ///
    /// The arguments are concatenated in order with no separators.
    pub async fn call(
        &self,
        method: impl Into<String>,
        args: Vec<TypedValue>,
        response: ResponseKind,
    ) -> Result<TypedValue, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Call {
            method: method.into(),
            args,
            response,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Like [`call`](Self::call), after checking `args` against `schema`.
    ///
    /// Nothing is sent when the check fails.
    pub async fn call_checked(
        &self,
        method: impl Into<String>,
        schema: &ArgSchema,
        args: Vec<TypedValue>,
        response: ResponseKind,
    ) -> Result<TypedValue, ClientError> {
        schema.check(&args)?;
        self.call(method, args, response).await
    }

    /// Registers `callback` for events on `channel`, replacing any previous
    /// one, and asks the server to start delivering.
    pub async fn subscribe<F>(
        &self,
        channel: impl Into<String>,
        callback: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Subscribe {
            channel: channel.into(),
            callback: Box::new(callback),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Forgets `channel` and asks the server to stop delivering it.
    pub async fn unsubscribe(&self, channel: impl Into<String>) -> Result<(), ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Unsubscribe {
            channel: channel.into(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Registers a listener called with `true` on each open and `false` on
    /// each close. Returns once the listener is in place.
    pub async fn on_connection_change<F>(&self, listener: F) -> Result<(), ClientError>
    where
        F: FnMut(bool) + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::OnConnectionChange {
            listener: Box::new(listener),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the connection is open.
    ///
    /// Fails with [`ClientError::ConnectionLost`] once the connection has
    /// closed with reconnect disabled, since it will never open again.
    pub async fn wait_open(&self) -> Result<(), ClientError> {
        let mut state = self.state.clone();
        let mut idle = self.idle.clone();
        tokio::select! {
            opened = state.wait_for(ConnectionState::is_open) => {
                opened.map(|_| ()).map_err(|_| ClientError::Shutdown)
            }
            idle = idle.wait_for(|idle| *idle) => match idle {
                Ok(_) => Err(ClientError::ConnectionLost),
                Err(_) => Err(ClientError::Shutdown),
            },
        }
    }

    /// A snapshot of the client's tables.
    pub async fn info(&self) -> Result<ClientInfo, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Info { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// Closes the connection for good. No reconnect follows.
    ///
    /// Pending calls resolve with [`ClientError::ConnectionLost`]. Closing an
    /// already-closed client is a no-op.
    pub async fn close(&self) -> Result<(), ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Close { reply: reply_tx }).await.is_err() {
            return Ok(());
        }
        let _ = reply_rx.await;
        Ok(())
    }

    async fn send(&self, cmd: Command) -> Result<(), ClientError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| ClientError::Shutdown)
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`TransportClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.config.reconnect = enabled;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    pub fn reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.config.reconnect_jitter = jitter;
        self
    }

    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn max_pending_calls(mut self, max: usize) -> Self {
        self.config.max_pending_calls = max;
        self
    }

    pub fn max_queued_frames(mut self, max: usize) -> Self {
        self.config.max_queued_frames = max;
        self
    }

    pub fn args_chunk_size(mut self, bytes: usize) -> Self {
        self.config.args_chunk_size = bytes;
        self
    }

    pub fn replay_subscriptions(mut self, enabled: bool) -> Self {
        self.config.replay_subscriptions = enabled;
        self
    }

    pub fn command_buffer(mut self, size: usize) -> Self {
        self.config.command_buffer = size;
        self
    }

    /// Spawns the client.
    pub fn connect<C: Connector>(self, connector: C) -> TransportClient {
        TransportClient::connect(connector, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_kind_payload_flag() {
        assert!(ResponseKind::Native.wants_payload());
        assert!(ResponseKind::Generic.wants_payload());
        assert!(!ResponseKind::None.wants_payload());
    }

    #[test]
    fn test_response_kind_resolve_framing() {
        let native = ResponseKind::Native.resolve(vec![1, 2]);
        assert_eq!(native.framing(), Framing::Native);
        assert_eq!(native.as_bytes(), &[1, 2]);

        let generic = ResponseKind::Generic.resolve(vec![2, 0, 0, 0, 0, 0, 0, 0, 7, 7]);
        assert_eq!(generic.framing(), Framing::Generic);
        assert_eq!(generic.payload(), &[7, 7]);

        let none = ResponseKind::None.resolve(vec![1, 2, 3]);
        assert!(none.is_empty());
        assert_eq!(none.framing(), Framing::Native);
    }

    #[test]
    fn test_builder_collects_settings() {
        let builder = TransportClient::builder()
            .reconnect(false)
            .call_timeout(None)
            .max_pending_calls(3)
            .args_chunk_size(300);
        assert!(!builder.config.reconnect);
        assert_eq!(builder.config.call_timeout, None);
        assert_eq!(builder.config.max_pending_calls, 3);
        assert_eq!(builder.config.args_chunk_size, 300);
    }
}
