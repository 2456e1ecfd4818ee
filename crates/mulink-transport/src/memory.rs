//! In-process connector for tests.
//!
//! [`memory_pair`] returns a [`MemoryConnector`] for the client and a
//! [`MemoryListener`] for the test. Every `connect` hands the listener a
//! [`MemoryPeer`]: the server side of that one connection, which the test
//! uses to read client frames and script replies.
//!
//! ```text
//! client ──connect──▶ MemoryConnector ──MemoryPeer──▶ MemoryListener::accept
//! client ◀──text/binary── MemoryPeer::send_*
//! client ──text──▶ MemoryPeer::recv
//! ```
//!
//! Dropping the listener makes further connects fail; dropping or closing
//! a peer closes that connection from the server side.

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, TransportError};

const ENDPOINT: &str = "memory";

/// Creates a connected connector/listener pair.
pub fn memory_pair() -> (MemoryConnector, MemoryListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryConnector { peers: tx }, MemoryListener { peers: rx })
}

/// Client side: opens in-process connections.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<Self::Connection, TransportError> {
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        let id = ConnectionId::next();

        let peer = MemoryPeer {
            id,
            tx: to_client,
            rx: Mutex::new(from_client),
        };
        self.peers
            .send(peer)
            .map_err(|_| TransportError::ConnectFailed {
                url: ENDPOINT.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "memory listener dropped",
                ),
            })?;

        Ok(MemoryConnection {
            id,
            tx: Mutex::new(Some(to_server)),
            rx: Mutex::new(from_server),
        })
    }

    fn endpoint(&self) -> &str {
        ENDPOINT
    }
}

/// Test side: receives one [`MemoryPeer`] per client connect.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next client connection.
    ///
    /// Returns `None` once every connector clone has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

/// Server side of one in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MemoryPeer {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Delivers a text message to the client.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send_binary(text.into().into_bytes())
    }

    /// Delivers a binary message to the client.
    pub fn send_binary(&self, data: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send(data)
            .map_err(|_| TransportError::ConnectionClosed("client went away".into()))
    }

    /// Reads the next frame the client sent.
    ///
    /// Returns `None` once the client has closed the connection.
    pub async fn recv(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    /// Closes the connection from the server side.
    pub fn close(self) {
        tracing::debug!(id = %self.id, "memory peer closing");
    }
}

/// Client side of one in-process connection.
#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Connection for MemoryConnection {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        };
        tx.send(frame)
            .map_err(|_| TransportError::ConnectionClosed("peer went away".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.tx.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
