//! Pool lifecycle events and status snapshots.

use chrono::{DateTime, Utc};
use imagepoly_core::JobKind;
use serde::Serialize;
use tokio::sync::broadcast;

/// Broadcast channel capacity for pool events.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something that happened to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A job left the queue and was handed to `slot`.
    Dispatched {
        kind: JobKind,
        slot: usize,
        at: DateTime<Utc>,
    },
    /// The job on `slot` finished; `ok` is false for any error.
    Completed {
        kind: JobKind,
        slot: usize,
        ok: bool,
        at: DateTime<Utc>,
    },
}

impl PoolEvent {
    /// A job was handed to `slot`.
    pub fn dispatched(kind: JobKind, slot: usize) -> Self {
        Self::Dispatched {
            kind,
            slot,
            at: Utc::now(),
        }
    }

    /// The job on `slot` finished.
    pub fn completed(kind: JobKind, slot: usize, ok: bool) -> Self {
        Self::Completed {
            kind,
            slot,
            ok,
            at: Utc::now(),
        }
    }

    /// The pool's job kind.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Dispatched { kind, .. } | Self::Completed { kind, .. } => *kind,
        }
    }

    /// The slot the event refers to.
    pub fn slot(&self) -> usize {
        match self {
            Self::Dispatched { slot, .. } | Self::Completed { slot, .. } => *slot,
        }
    }
}

/// Point-in-time counters for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub ready: usize,
    pub busy: usize,
    pub queued: usize,
}

impl PoolStatus {
    /// True when nothing is running and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.busy == 0 && self.queued == 0
    }
}

/// Publish `event`, ignoring the "no receivers" error.
pub(crate) fn emit(tx: &broadcast::Sender<PoolEvent>, event: PoolEvent) {
    let _ = tx.send(event);
}
