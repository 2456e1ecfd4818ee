//! Calls awaiting their response.
//!
//! Every call is registered here under its message id when its frame is
//! sent or queued, and leaves exactly once: on a matching response, on
//! its deadline, or when the connection closes.

use std::collections::{BTreeSet, HashMap};

use mulink_protocol::TypedValue;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::{ClientError, ResponseKind};

/// Where a call's result is delivered.
pub(crate) type Reply = oneshot::Sender<Result<TypedValue, ClientError>>;

/// One outstanding call.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub reply: Reply,
    pub response: ResponseKind,
    pub deadline: Option<Instant>,
}

/// Pending calls keyed by message id, with a deadline index.
#[derive(Debug)]
pub(crate) struct PendingTable {
    calls: HashMap<u64, PendingCall>,
    deadlines: BTreeSet<(Instant, u64)>,
    capacity: usize,
}

impl PendingTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            calls: HashMap::new(),
            deadlines: BTreeSet::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_full(&self) -> bool {
        self.calls.len() >= self.capacity
    }

    /// Registers `call` under `id`. The caller checks [`is_full`](Self::is_full) first.
    pub fn insert(&mut self, id: u64, call: PendingCall) {
        if let Some(deadline) = call.deadline {
            self.deadlines.insert((deadline, id));
        }
        if let Some(old) = self.calls.insert(id, call) {
            // Ids are unique per connection, so this is a bug upstream.
            tracing::warn!(id, "pending call id reused");
            self.forget_deadline(id, &old);
        }
    }

    /// Removes and returns the call waiting on `id`.
    pub fn take(&mut self, id: u64) -> Option<PendingCall> {
        let call = self.calls.remove(&id)?;
        self.forget_deadline(id, &call);
        Some(call)
    }

    /// The earliest deadline among pending calls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.first().map(|(at, _)| *at)
    }

    /// Removes every call whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<(u64, PendingCall)> {
        let mut expired = Vec::new();
        while let Some(&(at, id)) = self.deadlines.first() {
            if at > now {
                break;
            }
            self.deadlines.pop_first();
            if let Some(call) = self.calls.remove(&id) {
                expired.push((id, call));
            }
        }
        expired
    }

    /// Removes every call.
    pub fn drain(&mut self) -> impl Iterator<Item = (u64, PendingCall)> + '_ {
        self.deadlines.clear();
        self.calls.drain()
    }

    fn forget_deadline(&mut self, id: u64, call: &PendingCall) {
        if let Some(deadline) = call.deadline {
            self.deadlines.remove(&(deadline, id));
        }
    }
}
