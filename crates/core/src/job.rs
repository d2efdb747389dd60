//! Decode jobs and the executor seam they run through.
//!
//! On the wire a payload is a plain JSON array: `[hash, width, height]`
//! for a placeholder, `[source, format, token]` for an image.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::sink::Sink;
use crate::types::SessionToken;

/// The two job kinds, each with its own queue and pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Blurhash,
    Image,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blurhash => f.write_str("blurhash"),
            Self::Image => f.write_str("image"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Placeholder expansion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, u32, u32)", into = "(String, u32, u32)")]
pub struct BlurhashPayload {
    pub hash: String,
    pub width: u32,
    pub height: u32,
}

impl BlurhashPayload {
    /// Expand `hash` to `width` x `height` pixels.
    pub fn new(hash: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            hash: hash.into(),
            width,
            height,
        }
    }
}

impl From<(String, u32, u32)> for BlurhashPayload {
    fn from((hash, width, height): (String, u32, u32)) -> Self {
        Self {
            hash,
            width,
            height,
        }
    }
}

impl From<BlurhashPayload> for (String, u32, u32) {
    fn from(p: BlurhashPayload) -> Self {
        (p.hash, p.width, p.height)
    }
}

/// Fetch-and-decode request for an image the platform cannot decode itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct ImagePayload {
    pub source: String,
    pub format: String,
    pub auth_token: SessionToken,
}

impl ImagePayload {
    /// Fetch `source` as `format`, authenticated with `token`.
    pub fn new(source: impl Into<String>, format: impl Into<String>, token: SessionToken) -> Self {
        Self {
            source: source.into(),
            format: format.into(),
            auth_token: token,
        }
    }
}

impl From<(String, String, String)> for ImagePayload {
    fn from((source, format, token): (String, String, String)) -> Self {
        Self {
            source,
            format,
            auth_token: SessionToken::new(token),
        }
    }
}

impl From<ImagePayload> for (String, String, String) {
    fn from(p: ImagePayload) -> Self {
        (p.source, p.format, p.auth_token.as_str().to_string())
    }
}

/// What an execution unit is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobPayload {
    Blurhash(BlurhashPayload),
    Image(ImagePayload),
}

impl JobPayload {
    /// Which pool this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Blurhash(_) => JobKind::Blurhash,
            Self::Image(_) => JobKind::Image,
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A queued unit of work: the payload plus the sink its result goes to.
#[derive(Debug)]
pub struct Job {
    pub payload: JobPayload,
    pub sink: Sink,
}

impl Job {
    /// Pair a payload with the sink its result goes to.
    pub fn new(payload: JobPayload, sink: Sink) -> Self {
        Self { payload, sink }
    }

    /// Which pool this job belongs to.
    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

// ---------------------------------------------------------------------------
// Executor seam
// ---------------------------------------------------------------------------

/// Runs a payload to completion and returns the bitmap handle (or, for a
/// degraded image fetch, the original source locator).
///
/// Implemented by the decode pipeline; pools only see this trait.
#[async_trait]
pub trait JobExecutor: Send + Sync + 'static {
    async fn execute(&self, payload: JobPayload) -> Result<String, DecodeError>;
}
