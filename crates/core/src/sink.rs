//! Reactive output cells the pipeline writes decode results into.
//!
//! A [`Sink`] is the single writer; any number of [`SinkReader`]s observe
//! it. Backed by [`tokio::sync::watch`], so readers always see the latest
//! value and a sink may be written more than once.

use std::fmt;

use tokio::sync::watch;

use crate::error::DecodeError;

/// What a sink currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    /// Nothing rendered yet.
    Pending,
    /// A displayable locator: a `blob:` handle or the original source.
    Ready(String),
    /// The job failed. The UI is expected to fall back to the original source.
    Failed { reason: String },
}

impl RenderState {
    /// Whether nothing has been rendered yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The locator, when the state is [`RenderState::Ready`].
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::Ready(locator) => Some(locator),
            _ => None,
        }
    }
}

impl From<Result<String, DecodeError>> for RenderState {
    fn from(result: Result<String, DecodeError>) -> Self {
        match result {
            Ok(locator) => Self::Ready(locator),
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Create a connected writer/reader pair starting at [`RenderState::Pending`].
pub fn channel() -> (Sink, SinkReader) {
    let (tx, rx) = watch::channel(RenderState::Pending);
    (Sink { tx }, SinkReader { rx })
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Writing half of an output cell.
pub struct Sink {
    tx: watch::Sender<RenderState>,
}

impl Sink {
    /// Replace the current value. Succeeds even when nobody is listening.
    pub fn publish(&self, state: RenderState) {
        self.tx.send_replace(state);
    }

    /// Publish a displayable locator.
    pub fn ready(&self, locator: impl Into<String>) {
        self.publish(RenderState::Ready(locator.into()));
    }

    /// Publish a job outcome: `Ready` on success, an error marker otherwise.
    pub fn complete(&self, result: Result<String, DecodeError>) {
        self.publish(result.into());
    }

    /// A new reader that starts at the current value.
    pub fn subscribe(&self) -> SinkReader {
        SinkReader {
            rx: self.tx.subscribe(),
        }
    }

    /// The value last published.
    pub fn current(&self) -> RenderState {
        self.tx.borrow().clone()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("state", &*self.tx.borrow())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SinkReader
// ---------------------------------------------------------------------------

/// Reading half of an output cell. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SinkReader {
    rx: watch::Receiver<RenderState>,
}

impl SinkReader {
    /// The latest value, without marking it seen.
    pub fn current(&self) -> RenderState {
        self.rx.borrow().clone()
    }

    /// Wait for the next write. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<RenderState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the sink leaves [`RenderState::Pending`].
    ///
    /// If the writer is dropped while still pending, `Pending` is returned.
    pub async fn settled(&mut self) -> RenderState {
        let settled = match self.rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.rx.borrow().clone())
    }
}
