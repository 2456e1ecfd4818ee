//! # mulink
//!
//! Client for mulex experiment servers.
//!
//! One WebSocket connection carries typed RPC calls, event subscriptions
//! and runtime-database watches. The layers live in their own crates and
//! are re-exported here:
//!
//! - [`protocol`]: value kinds, the typed binary codec, JSON frames
//! - [`transport`]: the connection abstraction and WebSocket connector
//! - [`client`]: the reconnecting RPC/event client
//! - [`rdb`]: reactive key watches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mulink::prelude::*;
//!
//! # async fn run() -> Result<(), MulinkError> {
//! mulink::telemetry::init();
//! let mx = Mulink::builder().url("ws://127.0.0.1:5701").connect().await?;
//! mx.rdb()
//!     .watch("/system/backends/*/connected", |key, value| {
//!         println!("{key} = {:?}", value.astype(Kind::Bool));
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod connect;
mod error;
pub mod telemetry;

pub use connect::{DEFAULT_URL, Mulink, MulinkBuilder};
pub use error::MulinkError;

pub use mulink_client as client;
pub use mulink_protocol as protocol;
pub use mulink_rdb as rdb;
pub use mulink_transport as transport;

/// Everything a typical caller needs.
pub mod prelude {
    pub use crate::{Mulink, MulinkBuilder, MulinkError};
    pub use mulink_client::{
        ClientConfig, ClientError, ConnectionState, ResponseKind, TransportClient,
    };
    pub use mulink_protocol::{ArgSchema, Framing, Kind, TypedValue, Value};
    pub use mulink_rdb::{KeyPattern, Rdb, RdbError};
}
