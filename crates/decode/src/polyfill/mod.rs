//! Software decoders for codecs the platform may not decode natively.
//!
//! Each decoder turns encoded bytes into an RGBA8 [`PixelBuffer`], or
//! `None` when it cannot. Decoders are looked up by format tag in a
//! [`DecoderRegistry`].

pub mod avif;
pub mod jxl;

use std::collections::BTreeMap;
use std::sync::Arc;

use imagepoly_core::DecodeError;

pub use avif::AvifDecoder;
pub use jxl::JxlDecoder;

/// Decoded RGBA8 pixels, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A software decoder for one codec.
pub trait PolyfillDecoder: Send + Sync {
    /// Format tag this decoder answers to, e.g. `"jxl"`.
    fn format(&self) -> &'static str;

    /// Decode `bytes`; `None` when the payload cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Option<PixelBuffer>;
}

/// Format-tag → decoder lookup.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: BTreeMap<String, Arc<dyn PolyfillDecoder>>,
}

impl DecoderRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// JPEG XL and AVIF decoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(JxlDecoder));
        registry.register(Arc::new(AvifDecoder));
        registry
    }

    /// Add (or replace) the decoder for `decoder.format()`.
    pub fn register(&mut self, decoder: Arc<dyn PolyfillDecoder>) {
        self.decoders.insert(decoder.format().to_string(), decoder);
    }

    /// The decoder for `format`, or [`DecodeError::UnknownFormat`].
    pub fn lookup(&self, format: &str) -> Result<Arc<dyn PolyfillDecoder>, DecodeError> {
        self.decoders
            .get(format)
            .cloned()
            .ok_or_else(|| DecodeError::UnknownFormat(format.to_string()))
    }

    /// Registered format tags, sorted.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.formats()).finish()
    }
}
