//! Render orchestration for ImagePoly.
//!
//! - [`probe`]: startup probe of which exotic codecs decode natively, and
//!   the [`CapabilityService`] that owns the result.
//! - [`strategy`]: the two worker topologies behind [`RenderStrategy`].
//! - [`renderer`]: the [`Renderer`] façade the UI calls once per image.

pub mod probe;
pub mod renderer;
pub mod strategy;

pub use probe::{CapabilityService, CapabilityTable, FormatProber, ImageCrateProber};
pub use renderer::{Environment, Renderer, Topology, TopologyPreference};
pub use strategy::{DedicatedStrategy, RenderStrategy, SharedStrategy};
