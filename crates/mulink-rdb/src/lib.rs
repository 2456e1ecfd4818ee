//! Reactive runtime-database access for mulink.
//!
//! The runtime database (rdb) is a tree of `/`-separated keys living on
//! the server. [`Rdb`] wraps a [`TransportClient`](mulink_client::TransportClient)
//! and turns the server's watch protocol into plain callbacks:
//!
//! 1. `mulex::RdbWatch` is called with the key (or [`KeyPattern`]) and
//!    answers with an event channel name.
//! 2. The client subscribes to that channel.
//! 3. Each event carries the changed key in a 512-byte slot followed by
//!    its generic-framed value; the callback gets both.
//!
//! ```text
//! Rdb (this crate)            ← keys, patterns, watch callbacks
//!     ↕
//! TransportClient (below)     ← calls, subscriptions, reconnects
//! ```

mod error;
mod pattern;
mod rdb;

pub use error::RdbError;
pub use pattern::KeyPattern;
pub use rdb::Rdb;
