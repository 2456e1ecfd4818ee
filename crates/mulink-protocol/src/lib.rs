//! Wire protocol for mulink.
//!
//! This crate defines what a mulink client and a backend server exchange:
//!
//! - **Typed values** ([`Kind`], [`Framing`], [`TypedValue`], [`Value`]):
//!   the little-endian binary encoding of call arguments, return values
//!   and event payloads.
//! - **Records** ([`unpack`]): splitting a buffer of packed records back
//!   into tuples.
//! - **Frames** ([`ClientFrame`], [`ServerFrame`]): the JSON documents that
//!   carry those bytes over the connection.
//! - **Errors** ([`CodecError`], [`FrameError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or pending calls. It
//! only turns values into bytes and bytes into frames.
//!
//! ```text
//! Transport (text/binary messages) → Protocol (frames, typed values) → Client
//! ```

mod error;
mod frame;
mod kind;
mod schema;
mod unpack;
mod value;

pub use error::{CodecError, FrameError};
pub use frame::{
    ClientFrame, DEFAULT_ARGS_CHUNK, EVENT_CONTROL, EventControl, EventOpcode, RPC_REQUEST,
    RpcRequest, STATUS_OK, ServerFrame, decode_args, encode_args,
};
pub use kind::{Framing, Kind, LENGTH_PREFIX, STR32_WIDTH, STR512_WIDTH};
pub use schema::ArgSchema;
pub use unpack::unpack;
pub use value::{TypedValue, Value, concat, decode};
