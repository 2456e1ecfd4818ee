//! Persistent-connection RPC and event client for mulink.
//!
//! One [`TransportClient`] multiplexes request/response calls and
//! publish/subscribe events over a single connection. The connection is
//! owned by a spawned actor task; the client itself is a cheap handle.
//!
//! # Key types
//!
//! - [`TransportClient`]: call, subscribe, observe the connection
//! - [`ClientBuilder`] / [`ClientConfig`]: reconnect policy, timeouts, capacities
//! - [`ConnectionState`]: Connecting → Open → Closed
//! - [`ResponseKind`]: how a call's return bytes are framed
//! - [`ClientError`]: what a call can fail with
//!
//! # Ordering
//!
//! Responses are matched to calls by message id, so the server may answer
//! out of order. Frames issued while the connection is not open are queued
//! and sent in order once it opens. Events on one channel are delivered in
//! the order they arrive.

mod actor;
mod client;
mod config;
mod error;
mod pending;
mod subscriptions;

pub use client::{ClientBuilder, ClientInfo, ResponseKind, TransportClient};
pub use config::{ClientConfig, ConnectionState};
pub use error::ClientError;
pub use subscriptions::{ConnectionListener, EventCallback};
