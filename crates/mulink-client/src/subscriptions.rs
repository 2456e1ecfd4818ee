//! Event channel subscriptions.

use std::collections::HashMap;

/// Invoked with the raw payload of each event delivered on a channel.
///
/// Runs on the client task, so it must not block.
pub type EventCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Invoked with `true` on each entry into Open and `false` on each entry
/// into Closed.
pub type ConnectionListener = Box<dyn FnMut(bool) + Send + 'static>;

/// Live subscriptions of the current connection, plus the ones set aside
/// when the last connection dropped.
#[derive(Default)]
pub(crate) struct Subscriptions {
    live: HashMap<String, EventCallback>,
    retained: HashMap<String, EventCallback>,
}

impl Subscriptions {
    /// Registers `callback` for `channel`, replacing any previous one.
    pub fn insert(&mut self, channel: String, callback: EventCallback) {
        self.retained.remove(&channel);
        self.live.insert(channel, callback);
    }

    /// Drops `channel` from both the live and retained sets.
    pub fn remove(&mut self, channel: &str) -> bool {
        let live = self.live.remove(channel).is_some();
        let retained = self.retained.remove(channel).is_some();
        live || retained
    }

    pub fn get_mut(&mut self, channel: &str) -> Option<&mut EventCallback> {
        self.live.get_mut(channel)
    }

    pub fn is_live(&self, channel: &str) -> bool {
        self.live.contains_key(channel)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Clears the live set. With `retain`, its entries are kept aside for
    /// [`take_retained`](Self::take_retained).
    pub fn connection_closed(&mut self, retain: bool) {
        if retain {
            self.retained.extend(self.live.drain());
        } else {
            self.live.clear();
            self.retained.clear();
        }
    }

    /// Moves every retained channel back into the live set and returns
    /// the names that need a subscribe frame.
    pub fn take_retained(&mut self) -> Vec<String> {
        let mut channels = Vec::with_capacity(self.retained.len());
        for (channel, callback) in self.retained.drain() {
            if !self.live.contains_key(&channel) {
                channels.push(channel.clone());
                self.live.insert(channel, callback);
            }
        }
        channels.sort();
        channels
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("live", &self.live.keys().collect::<Vec<_>>())
            .field("retained", &self.retained.keys().collect::<Vec<_>>())
            .finish()
    }
}
