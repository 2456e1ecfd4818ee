//! Client actor: a Tokio task that owns the connection.
//!
//! All mutable state (message ids, pending calls, the outbound queue,
//! subscriptions, listeners) lives here and is touched only by this task.
//! The loop alternates between two modes:
//!
//! - **offline** (Connecting, or Closed waiting for a reconnect): commands
//!   are accepted and their frames pile up in the queue.
//! - **online** (Open): commands are accepted and the queue is flushed
//!   straight away; inbound frames are dispatched.
//!
//! Both modes also expire calls whose deadline has passed.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mulink_protocol::{
    ClientFrame, EventControl, EventOpcode, RpcRequest, STATUS_OK, ServerFrame, TypedValue,
};
use mulink_transport::{Connection, Connector, TransportError};
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::client::{ClientInfo, Command};
use crate::pending::{PendingCall, PendingTable};
use crate::subscriptions::{ConnectionListener, Subscriptions};
use crate::{ClientConfig, ClientError, ConnectionState, ResponseKind};

/// A frame waiting to be sent.
#[derive(Debug)]
struct Queued {
    /// Set for call frames so an expired call can be pulled back out.
    call_id: Option<u64>,
    frame: String,
}

/// Whether the actor keeps running after a command.
enum Flow {
    Continue,
    Stop,
}

/// Why the online loop ended.
enum Exit {
    /// The connection dropped or failed.
    Lost,
    /// `close()` was called or every handle was dropped.
    Shutdown,
}

pub(crate) struct ClientActor<C: Connector> {
    connector: Arc<C>,
    config: ClientConfig,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
    /// Flips to `true` when `accepting` goes `false`.
    idle: watch::Sender<bool>,
    next_id: u64,
    pending: PendingTable,
    queue: VecDeque<Queued>,
    subscriptions: Subscriptions,
    listeners: Vec<ConnectionListener>,
    /// `false` once closed with reconnect disabled: nothing will ever be sent.
    accepting: bool,
    closers: Vec<oneshot::Sender<()>>,
}

impl<C: Connector> ClientActor<C> {
    pub(crate) fn new(
        connector: Arc<C>,
        config: ClientConfig,
        commands: mpsc::Receiver<Command>,
        state: watch::Sender<ConnectionState>,
        idle: watch::Sender<bool>,
    ) -> Self {
        Self {
            connector,
            pending: PendingTable::new(config.max_pending_calls),
            queue: VecDeque::new(),
            config,
            commands,
            state,
            idle,
            next_id: 0,
            subscriptions: Subscriptions::default(),
            listeners: Vec::new(),
            accepting: true,
            closers: Vec::new(),
        }
    }

    /// Runs the connect / serve / reconnect cycle until shutdown.
    pub(crate) async fn run(mut self) {
        info!(endpoint = self.connector.endpoint(), "client started");

        loop {
            self.set_state(ConnectionState::Connecting);
            info!(endpoint = self.connector.endpoint(), "connecting");

            let connector = Arc::clone(&self.connector);
            let Some(attempt) = self.offline(connector.connect()).await else {
                break;
            };

            match attempt {
                Ok(conn) => {
                    let exit = self.online(&conn).await;
                    if let Err(e) = conn.close().await {
                        debug!(id = %conn.id(), error = %e, "close after disconnect failed");
                    }
                    self.enter_closed();
                    if let Exit::Shutdown = exit {
                        break;
                    }
                }
                Err(e) => {
                    warn!(endpoint = self.connector.endpoint(), error = %e, "connect failed");
                    self.enter_closed();
                }
            }

            if !self.config.reconnect {
                info!("reconnect disabled, client idle");
                self.accepting = false;
                self.idle.send_replace(true);
                // Serve Info/Close until shutdown; never returns Some.
                if self.offline(std::future::pending::<()>()).await.is_none() {
                    break;
                }
            }

            let delay = self.reconnect_delay();
            info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            if self.offline(tokio::time::sleep(delay)).await.is_none() {
                break;
            }
        }

        self.enter_closed();
        for closer in self.closers.drain(..) {
            let _ = closer.send(());
        }
        info!("client stopped");
    }

    /// Serves commands until `fut` completes. `None` means shut down.
    async fn offline<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            let deadline = self.pending.next_deadline();
            tokio::select! {
                out = &mut fut => return Some(out),
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { return None };
                    if let Flow::Stop = self.accept(cmd) {
                        return None;
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_calls();
                }
            }
        }
    }

    /// Serves an open connection until it drops or the client shuts down.
    async fn online(&mut self, conn: &C::Connection) -> Exit {
        self.set_state(ConnectionState::Open);
        info!(id = %conn.id(), "connection open");

        // Replayed subscriptions go out before anything queued.
        let replay = self.subscriptions.take_retained();
        for (index, channel) in replay.into_iter().enumerate() {
            debug!(%channel, "replaying subscription");
            match control_frame(EventOpcode::Subscribe, &channel) {
                Ok(frame) => self.queue.insert(index, Queued { call_id: None, frame }),
                Err(e) => warn!(%channel, error = %e, "could not encode subscribe frame"),
            }
        }
        if let Err(e) = self.flush(conn).await {
            warn!(id = %conn.id(), error = %e, "send failed");
            return Exit::Lost;
        }
        self.notify(true);

        loop {
            let deadline = self.pending.next_deadline();
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { return Exit::Shutdown };
                    if let Flow::Stop = self.accept(cmd) {
                        return Exit::Shutdown;
                    }
                    if let Err(e) = self.flush(conn).await {
                        warn!(id = %conn.id(), error = %e, "send failed");
                        return Exit::Lost;
                    }
                }
                msg = conn.recv() => match msg {
                    Ok(Some(data)) => self.dispatch(&data),
                    Ok(None) => {
                        info!(id = %conn.id(), "connection closed by server");
                        return Exit::Lost;
                    }
                    Err(e) => {
                        warn!(id = %conn.id(), error = %e, "receive failed");
                        return Exit::Lost;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_calls();
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn accept(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Call {
                method,
                args,
                response,
                reply,
            } => {
                let result = self.enqueue_call(method, &args, response);
                match result {
                    Ok((id, deadline)) => self.pending.insert(
                        id,
                        PendingCall {
                            reply,
                            response,
                            deadline,
                        },
                    ),
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Subscribe {
                channel,
                callback,
                reply,
            } => {
                let result = self
                    .enqueue_control(EventOpcode::Subscribe, &channel)
                    .map(|()| self.subscriptions.insert(channel, callback));
                let _ = reply.send(result);
            }
            Command::Unsubscribe { channel, reply } => {
                let known = self.subscriptions.remove(&channel);
                if !known {
                    debug!(%channel, "unsubscribe from channel without callback");
                }
                let result = if self.accepting {
                    self.enqueue_control(EventOpcode::Unsubscribe, &channel)
                } else {
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::OnConnectionChange { listener, reply } => {
                self.listeners.push(listener);
                let _ = reply.send(());
            }
            Command::Info { reply } => {
                let _ = reply.send(self.info());
            }
            Command::Close { reply } => {
                info!("close requested");
                self.closers.push(reply);
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Builds and queues a call frame. Returns its id and deadline.
    fn enqueue_call(
        &mut self,
        method: String,
        args: &[TypedValue],
        response: ResponseKind,
    ) -> Result<(u64, Option<Instant>), ClientError> {
        if !self.accepting {
            return Err(ClientError::ConnectionLost);
        }
        if self.pending.is_full() {
            warn!(%method, limit = self.pending.capacity(), "pending call table full");
            return Err(ClientError::TooManyPending(self.pending.capacity()));
        }
        self.check_queue_room()?;

        let id = self.next_id;
        let request = RpcRequest::new(
            method,
            args,
            id,
            response.wants_payload(),
            self.config.args_chunk_size,
        );
        debug!(id, method = %request.method, open = self.is_open(), "call");
        let frame = ClientFrame::Rpc(request)
            .to_json()
            .map_err(|e| ClientError::Encode(e.to_string()))?;

        self.next_id += 1;
        self.queue.push_back(Queued {
            call_id: Some(id),
            frame,
        });
        // A timeout too large for the clock means no deadline at all.
        let deadline = self
            .config
            .call_timeout
            .and_then(|t| Instant::now().checked_add(t));
        Ok((id, deadline))
    }

    fn enqueue_control(&mut self, opcode: EventOpcode, channel: &str) -> Result<(), ClientError> {
        if !self.accepting {
            return Err(ClientError::ConnectionLost);
        }
        self.check_queue_room()?;
        let frame = control_frame(opcode, channel)?;
        debug!(%channel, ?opcode, open = self.is_open(), "event control");
        self.queue.push_back(Queued {
            call_id: None,
            frame,
        });
        Ok(())
    }

    fn check_queue_room(&self) -> Result<(), ClientError> {
        if !self.is_open() && self.queue.len() >= self.config.max_queued_frames {
            warn!(limit = self.config.max_queued_frames, "outbound queue full");
            return Err(ClientError::QueueFull(self.config.max_queued_frames));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connection I/O
    // -----------------------------------------------------------------------

    /// Sends every queued frame in order.
    async fn flush(&mut self, conn: &C::Connection) -> Result<(), TransportError> {
        while let Some(queued) = self.queue.pop_front() {
            conn.send(queued.frame).await?;
        }
        Ok(())
    }

    /// Routes one inbound message.
    fn dispatch(&mut self, data: &[u8]) {
        let frame = match ServerFrame::from_slice(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = data.len(), "unparseable frame, ignoring");
                return;
            }
        };

        match frame {
            ServerFrame::Rpc {
                status,
                messageid,
                response,
            } => {
                let Some(call) = self.pending.take(messageid) else {
                    warn!(messageid, "response for unknown call, ignoring");
                    return;
                };
                let result = if status == STATUS_OK {
                    Ok(call.response.resolve(response))
                } else {
                    debug!(messageid, %status, "call rejected");
                    Err(ClientError::Permission(status))
                };
                let _ = call.reply.send(result);
            }
            ServerFrame::Event { event, response } => {
                match self.subscriptions.get_mut(&event) {
                    Some(callback) => callback(&response),
                    None => warn!(channel = %event, "event on unsubscribed channel, ignoring"),
                }
            }
        }
    }

    fn expire_calls(&mut self) {
        for (id, call) in self.pending.expire(Instant::now()) {
            debug!(id, "call timed out");
            self.queue.retain(|queued| queued.call_id != Some(id));
            let _ = call.reply.send(Err(ClientError::Timeout));
        }
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Moves to Closed and resets the per-connection tables.
    fn enter_closed(&mut self) {
        if *self.state.borrow() == ConnectionState::Closed {
            return;
        }
        self.set_state(ConnectionState::Closed);
        info!(
            abandoned = self.pending.len(),
            subscriptions = self.subscriptions.live_count(),
            "connection closed"
        );

        self.next_id = 0;
        for (_, call) in self.pending.drain() {
            let _ = call.reply.send(Err(ClientError::ConnectionLost));
        }
        self.queue.clear();
        self.subscriptions
            .connection_closed(self.config.replay_subscriptions);
        self.notify(false);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    fn notify(&mut self, open: bool) {
        for listener in &mut self.listeners {
            listener(open);
        }
    }

    fn info(&self) -> ClientInfo {
        ClientInfo {
            state: *self.state.borrow(),
            pending_calls: self.pending.len(),
            queued_frames: self.queue.len(),
            subscriptions: self.subscriptions.live_count(),
        }
    }

    fn reconnect_delay(&self) -> Duration {
        let jitter = u64::try_from(self.config.reconnect_jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = if jitter > 0 {
            rand::rng().random_range(0..=jitter)
        } else {
            0
        };
        self.config
            .reconnect_delay
            .saturating_add(Duration::from_millis(extra))
    }
}

fn control_frame(opcode: EventOpcode, channel: &str) -> Result<String, ClientError> {
    ClientFrame::Event(EventControl::new(opcode, channel))
        .to_json()
        .map_err(|e| ClientError::Encode(e.to_string()))
}
