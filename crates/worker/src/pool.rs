//! Dedicated worker pool: private slots with a FIFO queue.
//!
//! Each slot pairs an [`ExecutionUnit`] with a ready flag. A slot holds at
//! most one job; a job popped off the queue goes to exactly one slot.
//! Completion (success, error, panic, or a lost unit) always marks the
//! slot ready again and drains the queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use imagepoly_core::constants::pool_size;
use imagepoly_core::{DecodeError, Job, JobExecutor, JobKind, Sink};
use tokio::sync::broadcast;

use crate::events::{emit, PoolEvent, PoolStatus, EVENT_CHANNEL_CAPACITY};
use crate::unit::{await_reply, ExecutionUnit};

/// A fixed-size pool of execution units for one job kind.
///
/// Cheap to clone; clones share the same slots and queue. Must be created
/// inside a tokio runtime.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    kind: JobKind,
    units: Vec<ExecutionUnit>,
    state: Mutex<PoolState>,
    event_tx: broadcast::Sender<PoolEvent>,
}

struct PoolState {
    ready: Vec<bool>,
    queue: VecDeque<Job>,
}

impl WorkerPool {
    /// A pool sized by the build-time constant for `kind`.
    pub fn new(kind: JobKind, executor: Arc<dyn JobExecutor>) -> Self {
        Self::with_size(kind, pool_size(kind), executor)
    }

    /// A pool with an explicit slot count (at least one).
    pub fn with_size(kind: JobKind, size: usize, executor: Arc<dyn JobExecutor>) -> Self {
        let size = size.max(1);
        let units = (0..size)
            .map(|index| ExecutionUnit::spawn(kind, index, Arc::clone(&executor)))
            .collect();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(%kind, size, "Worker pool started");

        Self {
            inner: Arc::new(PoolInner {
                kind,
                units,
                state: Mutex::new(PoolState {
                    ready: vec![true; size],
                    queue: VecDeque::new(),
                }),
                event_tx,
            }),
        }
    }

    /// The job kind this pool runs.
    pub fn kind(&self) -> JobKind {
        self.inner.kind
    }

    /// Number of execution slots.
    pub fn size(&self) -> usize {
        self.inner.units.len()
    }

    /// Queue a job and dispatch whatever can run now.
    pub fn enqueue(&self, job: Job) {
        self.lock().queue.push_back(job);
        self.drain();
    }

    /// Hand queued jobs to ready slots until one side runs out.
    pub fn drain(&self) {
        loop {
            let (slot, job) = {
                let mut state = self.lock();
                let Some(slot) = state.ready.iter().position(|ready| *ready) else {
                    return;
                };
                let Some(job) = state.queue.pop_front() else {
                    return;
                };
                state.ready[slot] = false;
                (slot, job)
            };
            self.dispatch(slot, job);
        }
    }

    /// Snapshot of slot and queue counters.
    pub fn status(&self) -> PoolStatus {
        let state = self.lock();
        let ready = state.ready.iter().filter(|r| **r).count();
        PoolStatus {
            size: state.ready.len(),
            ready,
            busy: state.ready.len() - ready,
            queued: state.queue.len(),
        }
    }

    /// Subscribe to dispatch and completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.event_tx.subscribe()
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, slot: usize, job: Job) {
        let kind = self.inner.kind;
        let Job { payload, sink } = job;

        tracing::debug!(%kind, slot, "Dispatching job");
        emit(&self.inner.event_tx, PoolEvent::dispatched(kind, slot));

        let reply = self.inner.units[slot].post(payload);
        let pool = self.clone();
        tokio::spawn(async move {
            let result = await_reply(reply).await;
            pool.complete(slot, sink, result);
        });
    }

    fn complete(&self, slot: usize, sink: Sink, result: Result<String, DecodeError>) {
        let kind = self.inner.kind;
        let ok = result.is_ok();
        if let Err(e) = &result {
            tracing::warn!(%kind, slot, error = %e, "Job failed");
        }

        sink.complete(result);
        self.lock().ready[slot] = true;
        emit(&self.inner.event_tx, PoolEvent::completed(kind, slot, ok));

        self.drain();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("kind", &self.inner.kind)
            .field("status", &self.status())
            .finish()
    }
}
