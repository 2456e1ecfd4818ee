//! JSON frames exchanged over the persistent connection.
//!
//! One JSON document per message. Client frames carry a numeric `type`;
//! server frames carry a string `type`:
//!
//! ```text
//! client → server  {"type":0,"method":"…","args":"<base64>","messageid":3,"response":true}
//! client → server  {"type":1,"opcode":0,"event":"…"}
//! server → client  {"type":"rpc","status":"OK","messageid":3,"response":[1,2,3]}
//! server → client  {"type":"evt","event":"…","response":[1,2,3]}
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::{FrameError, TypedValue, concat};

/// `type` tag of an RPC request frame.
pub const RPC_REQUEST: u8 = 0;

/// `type` tag of an event control frame.
pub const EVENT_CONTROL: u8 = 1;

/// Status string of a successful RPC response.
pub const STATUS_OK: &str = "OK";

/// Default number of argument bytes base64-encoded per chunk.
///
/// A multiple of 3, so chunk boundaries never introduce padding and the
/// chunked output equals a one-shot encoding.
pub const DEFAULT_ARGS_CHUNK: usize = 32_766;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A remote procedure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(rename = "type")]
    pub frame_type: u8,
    pub method: String,
    /// Base64 of the concatenated argument bytes. Absent when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    pub messageid: u64,
    /// Whether the caller wants the return value.
    pub response: bool,
}

impl RpcRequest {
    /// Builds a request, encoding `args` in chunks of `chunk_size` bytes.
    pub fn new(
        method: impl Into<String>,
        args: &[TypedValue],
        messageid: u64,
        response: bool,
        chunk_size: usize,
    ) -> Self {
        // The server rejects an empty `args` field, so zero bytes means absent.
        let bytes = concat(args);
        let args = if bytes.is_empty() {
            None
        } else {
            Some(encode_args(&bytes, chunk_size))
        };
        Self {
            frame_type: RPC_REQUEST,
            method: method.into(),
            args,
            messageid,
            response,
        }
    }
}

/// Subscribe or unsubscribe, as sent in [`EventControl::opcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EventOpcode {
    Subscribe,
    Unsubscribe,
}

impl From<EventOpcode> for u8 {
    fn from(op: EventOpcode) -> u8 {
        match op {
            EventOpcode::Subscribe => 0,
            EventOpcode::Unsubscribe => 1,
        }
    }
}

impl TryFrom<u8> for EventOpcode {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(EventOpcode::Subscribe),
            1 => Ok(EventOpcode::Unsubscribe),
            other => Err(format!("unknown event opcode {other}")),
        }
    }
}

/// Adds or removes this connection from an event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventControl {
    #[serde(rename = "type")]
    pub frame_type: u8,
    pub opcode: EventOpcode,
    pub event: String,
}

impl EventControl {
    pub fn new(opcode: EventOpcode, event: impl Into<String>) -> Self {
        Self {
            frame_type: EVENT_CONTROL,
            opcode,
            event: event.into(),
        }
    }
}

/// Any frame the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Rpc(RpcRequest),
    Event(EventControl),
}

impl ClientFrame {
    /// Serializes the frame to its JSON text.
    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Parses a client frame. Servers and test peers use this.
    pub fn from_slice(data: &[u8]) -> Result<Self, FrameError> {
        serde_json::from_slice(data).map_err(FrameError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Any frame the server sends.
///
/// A missing `response` array is treated as an empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// The outcome of an earlier [`RpcRequest`] with the same `messageid`.
    #[serde(rename = "rpc")]
    Rpc {
        status: String,
        messageid: u64,
        #[serde(default)]
        response: Vec<u8>,
    },

    /// A message published on a subscribed channel.
    #[serde(rename = "evt")]
    Event {
        event: String,
        #[serde(default)]
        response: Vec<u8>,
    },
}

impl ServerFrame {
    /// A successful response carrying `payload`.
    pub fn ok(messageid: u64, payload: Vec<u8>) -> Self {
        ServerFrame::Rpc {
            status: STATUS_OK.to_string(),
            messageid,
            response: payload,
        }
    }

    /// An event delivery on `channel`.
    pub fn event(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        ServerFrame::Event {
            event: channel.into(),
            response: payload,
        }
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, FrameError> {
        serde_json::from_slice(data).map_err(FrameError::Decode)
    }

    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Argument encoding
// ---------------------------------------------------------------------------

/// Base64-encodes `bytes`, `chunk_size` input bytes at a time.
///
/// `chunk_size` is rounded down to a multiple of 3 (minimum 3).
pub fn encode_args(bytes: &[u8], chunk_size: usize) -> String {
    let chunk = (chunk_size / 3).max(1) * 3;
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for part in bytes.chunks(chunk) {
        STANDARD.encode_string(part, &mut out);
    }
    out
}

/// Reverses [`encode_args`].
pub fn decode_args(args: &str) -> Result<Vec<u8>, FrameError> {
    STANDARD.decode(args).map_err(FrameError::Args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Framing;

    // =====================================================================
    // Client frames
    // =====================================================================

    #[test]
    fn test_rpc_request_json_shape() {
        let args = [TypedValue::u8(5, Framing::Native)];
        let frame = ClientFrame::Rpc(RpcRequest::new("mulex::Ping", &args, 7, true, DEFAULT_ARGS_CHUNK));
        let json: serde_json::Value =
            serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], 0);
        assert_eq!(json["method"], "mulex::Ping");
        assert_eq!(json["args"], "BQ==");
        assert_eq!(json["messageid"], 7);
        assert_eq!(json["response"], true);
    }

    #[test]
    fn test_rpc_request_without_args_omits_field() {
        let frame = ClientFrame::Rpc(RpcRequest::new("mulex::SysGetExperimentName", &[], 0, true, DEFAULT_ARGS_CHUNK));
        let json: serde_json::Value =
            serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        assert!(json.get("args").is_none());
    }

    #[test]
    fn test_rpc_request_with_zero_byte_args_omits_field() {
        let args = [TypedValue::bytes(&[], Framing::Native)];
        let request = RpcRequest::new("m", &args, 0, true, DEFAULT_ARGS_CHUNK);
        assert_eq!(request.args, None);

        let json: serde_json::Value =
            serde_json::from_str(&ClientFrame::Rpc(request).to_json().unwrap()).unwrap();
        assert!(json.get("args").is_none());
    }

    #[test]
    fn test_event_control_json_shape() {
        let frame = ClientFrame::Event(EventControl::new(EventOpcode::Unsubscribe, "mxevt::rdbw-1f"));
        let json: serde_json::Value =
            serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], 1);
        assert_eq!(json["opcode"], 1);
        assert_eq!(json["event"], "mxevt::rdbw-1f");
    }

    #[test]
    fn test_client_frame_parses_back() {
        let sub = ClientFrame::Event(EventControl::new(EventOpcode::Subscribe, "chan"));
        let parsed = ClientFrame::from_slice(sub.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, sub);

        let rpc = ClientFrame::Rpc(RpcRequest::new("m", &[], 3, false, DEFAULT_ARGS_CHUNK));
        let parsed = ClientFrame::from_slice(rpc.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, rpc);
    }

    #[test]
    fn test_unknown_opcode_is_rejected() {
        let json = r#"{"type":1,"opcode":7,"event":"x"}"#;
        assert!(serde_json::from_str::<EventControl>(json).is_err());
    }

    // =====================================================================
    // Server frames
    // =====================================================================

    #[test]
    fn test_parse_rpc_response() {
        let json = br#"{"response":[1,0,0,0],"status":"OK","type":"rpc","messageid":4}"#;
        let frame = ServerFrame::from_slice(json).unwrap();
        assert_eq!(frame, ServerFrame::ok(4, vec![1, 0, 0, 0]));
    }

    #[test]
    fn test_parse_rpc_response_without_payload() {
        let json = br#"{"status":"OK","type":"rpc","messageid":9}"#;
        let frame = ServerFrame::from_slice(json).unwrap();
        assert_eq!(frame, ServerFrame::ok(9, vec![]));
    }

    #[test]
    fn test_parse_event_delivery() {
        let json = br#"{"response":[7],"event":"mxmsg::message","type":"evt"}"#;
        let frame = ServerFrame::from_slice(json).unwrap();
        assert_eq!(frame, ServerFrame::event("mxmsg::message", vec![7]));
    }

    #[test]
    fn test_unknown_server_frame_type_is_rejected() {
        let json = br#"{"type":"hello"}"#;
        assert!(ServerFrame::from_slice(json).is_err());
    }

    // =====================================================================
    // Argument chunking
    // =====================================================================

    #[test]
    fn test_chunked_encoding_equals_one_shot() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let one_shot = STANDARD.encode(&data);
        assert_eq!(encode_args(&data, DEFAULT_ARGS_CHUNK), one_shot);
        assert_eq!(encode_args(&data, 1000), one_shot);
        assert_eq!(encode_args(&data, 1), one_shot);
        assert_eq!(decode_args(&one_shot).unwrap(), data);
    }
}
