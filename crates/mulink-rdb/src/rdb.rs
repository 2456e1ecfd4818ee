//! The `Rdb` handle: reactive watches plus direct reads and writes.

use mulink_client::{ResponseKind, TransportClient};
use mulink_protocol::{CodecError, Framing, Kind, STR512_WIDTH, TypedValue, Value};
use tracing::{debug, warn};

use crate::{KeyPattern, RdbError};

const RDB_WATCH: &str = "mulex::RdbWatch";
const RDB_READ: &str = "mulex::RdbReadValueDirect";
const RDB_WRITE: &str = "mulex::RdbWriteValueDirect";
const RDB_EXISTS: &str = "mulex::RdbValueExists";
const RDB_DELETE: &str = "mulex::RdbDeleteValueDirect";
const RDB_LIST: &str = "mulex::RdbListSubkeys";

/// A view of the runtime database, optionally rooted at a key prefix.
///
/// Every key passed in is prefixed with the root before it reaches the
/// server. Keys handed to watch callbacks are the full keys the server
/// reports, root included.
#[derive(Debug, Clone)]
pub struct Rdb {
    client: TransportClient,
    root: String,
}

impl Rdb {
    pub fn new(client: TransportClient) -> Self {
        Self::with_root(client, "")
    }

    /// A view whose keys are all relative to `root`.
    pub fn with_root(client: TransportClient, root: impl Into<String>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    /// Calls `callback(key, value)` every time a key covered by `key`
    /// changes. `key` may be a [`KeyPattern`].
    ///
    /// Returns the event channel the server assigned. Watching the same key
    /// twice replaces the earlier callback. Every update on the channel is
    /// delivered, including keys [`KeyPattern`] would not match.
    pub async fn watch<F>(&self, key: &str, mut callback: F) -> Result<String, RdbError>
    where
        F: FnMut(String, TypedValue) + Send + 'static,
    {
        let full = self.full_key(key);
        let channel = self.watch_channel(&full).await?;
        let pattern = KeyPattern::new(full);

        let subscribed = channel.clone();
        self.client
            .subscribe(channel.clone(), move |data: &[u8]| {
                let Some((key, value)) = split_update(data) else {
                    warn!(channel = %subscribed, len = data.len(), "short watch update dropped");
                    return;
                };
                // The server decides which keys reach the channel.
                if !pattern.matches(&key) {
                    debug!(channel = %subscribed, %key, %pattern, "watch update outside local pattern");
                }
                callback(key, value);
            })
            .await?;

        debug!(%channel, key, "watch registered");
        Ok(channel)
    }

    /// Stops the watch set up by [`watch`](Self::watch) for the same key.
    pub async fn unwatch(&self, key: &str) -> Result<(), RdbError> {
        let full = self.full_key(key);
        let channel = self.watch_channel(&full).await?;
        self.client.unsubscribe(channel.clone()).await?;
        debug!(%channel, key, "watch removed");
        Ok(())
    }

    /// Reads the current value of `key`.
    ///
    /// The server answers an unknown key with an empty payload.
    pub async fn read(&self, key: &str) -> Result<TypedValue, RdbError> {
        let args = vec![self.key_arg(key)?];
        Ok(self.client.call(RDB_READ, args, ResponseKind::Generic).await?)
    }

    /// Overwrites the value of an existing `key`.
    ///
    /// `value` is sent generic-framed whatever framing it was built with.
    /// The server ignores writes to unknown keys and writes whose size does
    /// not match the stored value.
    pub async fn write(&self, key: &str, value: &TypedValue) -> Result<(), RdbError> {
        let args = vec![self.key_arg(key)?, as_generic(value)];
        self.client.call(RDB_WRITE, args, ResponseKind::None).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, RdbError> {
        let args = vec![self.key_arg(key)?];
        let reply = self.client.call(RDB_EXISTS, args, ResponseKind::Native).await?;
        match reply.decode(Kind::Bool)? {
            Value::Bool(exists) => Ok(exists),
            other => Err(RdbError::UnexpectedReply {
                method: RDB_EXISTS,
                reason: format!("expected a bool, got {other}"),
            }),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), RdbError> {
        let args = vec![self.key_arg(key)?];
        self.client.call(RDB_DELETE, args, ResponseKind::None).await?;
        Ok(())
    }

    /// Lists the keys under a directory (`/system/backends/`) or covered by
    /// a pattern (`/system/backends/*/name`).
    pub async fn list_subkeys(&self, pattern: &str) -> Result<Vec<String>, RdbError> {
        let args = vec![self.key_arg(pattern)?];
        let reply = self.client.call(RDB_LIST, args, ResponseKind::Generic).await?;
        match reply.decode(Kind::StringArray) {
            Ok(Value::Strings(keys)) => Ok(keys),
            Ok(other) => Err(RdbError::UnexpectedReply {
                method: RDB_LIST,
                reason: format!("expected a string array, got {other}"),
            }),
            // A bare empty buffer means nothing matched.
            Err(CodecError::Empty) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.root, key)
    }

    fn key_arg(&self, key: &str) -> Result<TypedValue, RdbError> {
        Ok(TypedValue::str512(&self.full_key(key), Framing::Native)?)
    }

    /// Asks the server for the event channel of `full_key`.
    async fn watch_channel(&self, full_key: &str) -> Result<String, RdbError> {
        let args = vec![TypedValue::str512(full_key, Framing::Native)?];
        let reply = self.client.call(RDB_WATCH, args, ResponseKind::Native).await?;
        match reply.decode(Kind::Str32) {
            Ok(Value::Str(channel)) if !channel.is_empty() => Ok(channel),
            Ok(_) | Err(CodecError::Empty) => Err(RdbError::WatchRejected(full_key.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Splits a watch update into the 512-byte key slot and the generic value
/// that follows it.
fn split_update(data: &[u8]) -> Option<(String, TypedValue)> {
    if data.len() < STR512_WIDTH {
        return None;
    }
    let (slot, rest) = data.split_at(STR512_WIDTH);
    let key = match mulink_protocol::decode(slot, Kind::Str512, Framing::Native) {
        Ok(Value::Str(key)) => key,
        _ => return None,
    };
    Some((key, TypedValue::from_bytes(rest.to_vec(), Framing::Generic)))
}

fn as_generic(value: &TypedValue) -> TypedValue {
    match value.framing() {
        Framing::Generic => value.clone(),
        Framing::Native => TypedValue::bytes(value.as_bytes(), Framing::Generic),
    }
}
