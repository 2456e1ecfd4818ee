//! `Mulink` builder and handle.
//!
//! This is the entry point for talking to a mulex server. It ties the
//! layers together: WebSocket transport → frames → client actor → rdb.

use std::time::Duration;

use mulink_client::{ClientConfig, ClientError, ResponseKind, TransportClient};
use mulink_protocol::Kind;
use mulink_rdb::Rdb;
use mulink_transport::WebSocketConnector;
use tracing::info;

use crate::MulinkError;

/// The server address used when none is given.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:5701";

const SYS_EXPERIMENT_NAME: &str = "mulex::SysGetExperimentName";

/// Builder for a [`Mulink`] connection.
///
/// # Example
///
/// ```rust,ignore
/// use mulink::prelude::*;
///
/// let mx = Mulink::builder()
///     .url("ws://127.0.0.1:5701")
///     .connect()
///     .await?;
/// println!("experiment: {}", mx.experiment_name().await?);
/// ```
#[derive(Debug, Clone)]
pub struct MulinkBuilder {
    url: String,
    config: ClientConfig,
    open_timeout: Option<Duration>,
}

impl MulinkBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            config: ClientConfig::default(),
            open_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Sets the server URL (`ws://host:port`).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// How long [`connect`](Self::connect) waits for the first open.
    ///
    /// `None` returns as soon as the client is spawned; calls made before
    /// the connection opens are queued.
    pub fn open_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Spawns the client and, unless disabled, waits for it to open.
    ///
    /// # Errors
    /// [`MulinkError::InvalidUrl`] for a non-WebSocket URL, and
    /// [`ClientError::Timeout`] when the connection does not open in time.
    /// The client is closed before the timeout is returned.
    pub async fn connect(self) -> Result<Mulink, MulinkError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(MulinkError::InvalidUrl(self.url));
        }

        info!(url = %self.url, "connecting to mulex server");
        let client = TransportClient::connect(WebSocketConnector::new(self.url.clone()), self.config);

        if let Some(limit) = self.open_timeout {
            match tokio::time::timeout(limit, client.wait_open()).await {
                Ok(opened) => opened?,
                Err(_) => {
                    client.close().await?;
                    return Err(ClientError::Timeout.into());
                }
            }
        }

        Ok(Mulink {
            client,
            url: self.url,
        })
    }
}

impl Default for MulinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection to a mulex server.
#[derive(Debug, Clone)]
pub struct Mulink {
    client: TransportClient,
    url: String,
}

impl Mulink {
    pub fn builder() -> MulinkBuilder {
        MulinkBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The underlying client, for raw calls and subscriptions.
    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    /// The runtime database, with absolute keys.
    pub fn rdb(&self) -> Rdb {
        Rdb::new(self.client.clone())
    }

    /// The runtime database, with keys relative to `root`.
    pub fn rdb_at(&self, root: impl Into<String>) -> Rdb {
        Rdb::with_root(self.client.clone(), root)
    }

    /// The name of the experiment the server is running.
    pub async fn experiment_name(&self) -> Result<String, MulinkError> {
        let reply = self
            .client
            .call(SYS_EXPERIMENT_NAME, vec![], ResponseKind::Generic)
            .await?;
        // Strings decode to `Value::Str` whatever their length.
        let name = reply.decode(Kind::Str512)?;
        Ok(name.as_str().unwrap_or_default().to_owned())
    }

    /// Closes the connection for good.
    pub async fn close(&self) -> Result<(), MulinkError> {
        info!(url = %self.url, "closing mulex connection");
        Ok(self.client.close().await?)
    }
}
