//! A long-lived execution unit: one task, one job at a time.
//!
//! Payloads are posted over an unbounded channel together with a one-shot
//! reply. The unit runs each payload through the [`JobExecutor`] and sends
//! back whatever came out, including a caught panic.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use imagepoly_core::{DecodeError, JobExecutor, JobKind, JobPayload};
use tokio::sync::{mpsc, oneshot};

/// Reply half handed back by [`ExecutionUnit::post`].
pub type Reply = oneshot::Receiver<Result<String, DecodeError>>;

struct Request {
    payload: JobPayload,
    reply: oneshot::Sender<Result<String, DecodeError>>,
}

/// Handle to a running execution unit.
///
/// Dropping the last handle closes the channel and the unit's task exits
/// after its current job.
#[derive(Debug)]
pub struct ExecutionUnit {
    kind: JobKind,
    index: usize,
    tx: mpsc::UnboundedSender<Request>,
}

impl ExecutionUnit {
    /// Start a unit on the current tokio runtime.
    pub fn spawn(kind: JobKind, index: usize, executor: Arc<dyn JobExecutor>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();

        tokio::spawn(async move {
            tracing::debug!(%kind, slot = index, "Execution unit started");
            while let Some(Request { payload, reply }) = rx.recv().await {
                let result = AssertUnwindSafe(executor.execute(payload))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(DecodeError::Panicked(panic_message(&*panic))));

                if reply.send(result).is_err() {
                    tracing::debug!(%kind, slot = index, "Reply receiver dropped");
                }
            }
            tracing::debug!(%kind, slot = index, "Execution unit stopped");
        });

        Self { kind, index, tx }
    }

    /// The job kind this unit runs.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Slot index within the owning pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Post a payload. The returned receiver resolves with the result, or
    /// errors if the unit went away without answering.
    pub fn post(&self, payload: JobPayload) -> Reply {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request { payload, reply }).is_err() {
            tracing::warn!(kind = %self.kind, slot = self.index, "Execution unit is gone");
        }
        rx
    }

    /// Post a payload and wait for its result.
    pub async fn run(&self, payload: JobPayload) -> Result<String, DecodeError> {
        await_reply(self.post(payload)).await
    }
}

/// Resolve a reply, mapping a dropped sender to [`DecodeError::WorkerLost`].
pub async fn await_reply(reply: Reply) -> Result<String, DecodeError> {
    reply.await.unwrap_or(Err(DecodeError::WorkerLost))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "execution unit panicked".to_string()
    }
}
