//! Shared pool: one actor per job kind, many connected clients.
//!
//! The actor task owns the queue, the slots, and an in-flight counter that
//! is checked against the pool size before anything is dispatched. Clients
//! [`connect`](SharedPool::connect) to get a [`MessagePort`], post payloads
//! through it, and read results back from the same port. Results carry the
//! [`MessageId`] returned by the post so clients can correlate them.
//!
//! All scheduling happens inside the actor's loop, so dispatch never runs
//! concurrently with itself and needs no lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use imagepoly_core::constants::pool_size;
use imagepoly_core::{DecodeError, JobExecutor, JobKind, JobPayload};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::events::{emit, PoolEvent, PoolStatus, EVENT_CHANNEL_CAPACITY};
use crate::unit::{await_reply, ExecutionUnit};

/// Correlates a posted payload with its reply on the same port.
pub type MessageId = u64;

/// A result delivered to a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReply {
    pub id: MessageId,
    pub result: Result<String, DecodeError>,
}

enum Command {
    Post(Posted),
    Status(oneshot::Sender<PoolStatus>),
}

struct Posted {
    id: MessageId,
    payload: JobPayload,
    reply_to: mpsc::UnboundedSender<PortReply>,
}

struct Finished {
    slot: usize,
    id: MessageId,
    reply_to: mpsc::UnboundedSender<PortReply>,
    result: Result<String, DecodeError>,
}

// ---------------------------------------------------------------------------
// SharedPool
// ---------------------------------------------------------------------------

/// Handle to a running shared pool. Cheap to clone.
#[derive(Clone)]
pub struct SharedPool {
    kind: JobKind,
    size: usize,
    commands: mpsc::UnboundedSender<Command>,
    connections: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
    event_tx: broadcast::Sender<PoolEvent>,
    cancel: CancellationToken,
}

impl SharedPool {
    /// Start a pool sized by the build-time constant for `kind`.
    pub fn start(kind: JobKind, executor: Arc<dyn JobExecutor>) -> Self {
        Self::with_size(kind, pool_size(kind), executor)
    }

    /// Start a pool with an explicit slot count (at least one).
    pub fn with_size(kind: JobKind, size: usize, executor: Arc<dyn JobExecutor>) -> Self {
        let size = size.max(1);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let actor = Actor {
            kind,
            units: (0..size)
                .map(|index| ExecutionUnit::spawn(kind, index, Arc::clone(&executor)))
                .collect(),
            ready: vec![true; size],
            in_flight: 0,
            queue: VecDeque::new(),
            event_tx: event_tx.clone(),
        };
        tokio::spawn(actor.run(command_rx, cancel.clone()));

        tracing::info!(%kind, size, "Shared pool started");

        Self {
            kind,
            size,
            commands,
            connections: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicU64::new(0)),
            event_tx,
            cancel,
        }
    }

    /// The job kind this pool runs.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Number of execution slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Open a new port to the pool.
    pub fn connect(&self) -> MessagePort {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let count = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(kind = %self.kind, connections = count, "Port connected");

        let connection = Arc::new(ConnectionGuard(Arc::clone(&self.connections)));
        MessagePort {
            sender: PortSender {
                commands: self.commands.clone(),
                reply_tx,
                next_id: Arc::clone(&self.next_id),
                _connection: Arc::clone(&connection),
            },
            inbox: PortInbox {
                rx: reply_rx,
                _connection: connection,
            },
        }
    }

    /// Number of ports currently connected.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Ask the actor for its counters.
    pub async fn status(&self) -> Result<PoolStatus, SharedPoolError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Status(tx))
            .map_err(|_| SharedPoolError::Closed)?;
        rx.await.map_err(|_| SharedPoolError::Closed)
    }

    /// Subscribe to dispatch and completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the actor. Queued and in-flight jobs get no reply.
    pub fn shutdown(&self) {
        tracing::info!(kind = %self.kind, "Shutting down shared pool");
        self.cancel.cancel();
    }

    /// True once the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("connections", &self.connections())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// A client's connection to a [`SharedPool`].
#[derive(Debug)]
pub struct MessagePort {
    sender: PortSender,
    inbox: PortInbox,
}

impl MessagePort {
    /// Post a job; the reply arrives on this port.
    pub fn post_message(&self, payload: JobPayload) -> Result<MessageId, SharedPoolError> {
        self.sender.post_message(payload)
    }

    /// Next reply, in completion order. `None` once the port can no longer
    /// receive anything.
    pub async fn recv(&mut self) -> Option<PortReply> {
        self.inbox.recv().await
    }

    /// Separate the posting half from the receiving half.
    ///
    /// The connection stays open until both halves are dropped. Once every
    /// sender is gone the inbox ends after the last outstanding reply.
    pub fn split(self) -> (PortSender, PortInbox) {
        (self.sender, self.inbox)
    }
}

/// Posting half of a port. Clones share the same connection.
#[derive(Debug, Clone)]
pub struct PortSender {
    commands: mpsc::UnboundedSender<Command>,
    reply_tx: mpsc::UnboundedSender<PortReply>,
    next_id: Arc<AtomicU64>,
    _connection: Arc<ConnectionGuard>,
}

impl PortSender {
    /// Post a job; the reply arrives on the paired inbox.
    pub fn post_message(&self, payload: JobPayload) -> Result<MessageId, SharedPoolError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.commands
            .send(Command::Post(Posted {
                id,
                payload,
                reply_to: self.reply_tx.clone(),
            }))
            .map_err(|_| SharedPoolError::Closed)?;
        Ok(id)
    }
}

/// Receiving half of a port.
#[derive(Debug)]
pub struct PortInbox {
    rx: mpsc::UnboundedReceiver<PortReply>,
    _connection: Arc<ConnectionGuard>,
}

impl PortInbox {
    /// Next reply, or `None` once the pool is gone and every sender dropped.
    pub async fn recv(&mut self) -> Option<PortReply> {
        self.rx.recv().await
    }
}

/// Decrements the connection count when the last half of a port goes away.
#[derive(Debug)]
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct Actor {
    kind: JobKind,
    units: Vec<ExecutionUnit>,
    ready: Vec<bool>,
    in_flight: usize,
    queue: VecDeque<Posted>,
    event_tx: broadcast::Sender<PoolEvent>,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
        let (finished_tx, mut finished_rx) = mpsc::unbounded_channel::<Finished>();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(done) = finished_rx.recv() => self.finish(done),
                command = commands.recv() => match command {
                    Some(Command::Post(posted)) => self.queue.push_back(posted),
                    Some(Command::Status(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    None => break,
                },
            }
            self.dispatch(&finished_tx);
        }

        tracing::info!(kind = %self.kind, queued = self.queue.len(), "Shared pool stopped");
    }

    fn dispatch(&mut self, finished_tx: &mpsc::UnboundedSender<Finished>) {
        while self.in_flight < self.units.len() {
            let Some(slot) = self.ready.iter().position(|ready| *ready) else {
                break;
            };
            let Some(Posted { id, payload, reply_to }) = self.queue.pop_front() else {
                break;
            };

            self.ready[slot] = false;
            self.in_flight += 1;
            tracing::debug!(kind = %self.kind, slot, id, "Dispatching shared job");
            emit(&self.event_tx, PoolEvent::dispatched(self.kind, slot));

            let reply = self.units[slot].post(payload);
            let finished_tx = finished_tx.clone();
            tokio::spawn(async move {
                let result = await_reply(reply).await;
                let _ = finished_tx.send(Finished {
                    slot,
                    id,
                    reply_to,
                    result,
                });
            });
        }
    }

    fn finish(&mut self, done: Finished) {
        let Finished {
            slot,
            id,
            reply_to,
            result,
        } = done;

        let ok = result.is_ok();
        if let Err(e) = &result {
            tracing::warn!(kind = %self.kind, slot, id, error = %e, "Shared job failed");
        }
        if reply_to.send(PortReply { id, result }).is_err() {
            tracing::debug!(kind = %self.kind, id, "Port closed before reply");
        }

        self.ready[slot] = true;
        self.in_flight = self.in_flight.saturating_sub(1);
        emit(&self.event_tx, PoolEvent::completed(self.kind, slot, ok));
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.units.len(),
            ready: self.units.len() - self.in_flight,
            busy: self.in_flight,
            queued: self.queue.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by the shared pool handle and its ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SharedPoolError {
    #[error("Shared pool has shut down")]
    Closed,
}
