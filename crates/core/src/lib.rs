//! Shared domain types for the ImagePoly decode/render pipeline.
//!
//! Holds the data model that every other crate speaks: image descriptors,
//! job payloads, reactive output sinks, the decode error taxonomy, and the
//! compile-time pool constants. This crate has no internal dependencies.

pub mod constants;
pub mod error;
pub mod job;
pub mod sink;
pub mod types;

pub use error::DecodeError;
pub use job::{BlurhashPayload, ImagePayload, Job, JobExecutor, JobKind, JobPayload};
pub use sink::{RenderState, Sink, SinkReader};
pub use types::{ExoticFormat, ImageDescriptor, SessionToken};
