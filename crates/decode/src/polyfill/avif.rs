//! AVIF decoding through the `image` crate.
//!
//! Real decoding needs the `avif-native` feature (dav1d). Without it every
//! payload is reported as undecodable.

use image::ImageFormat;

use super::{PixelBuffer, PolyfillDecoder};

#[derive(Debug, Clone, Copy, Default)]
pub struct AvifDecoder;

impl PolyfillDecoder for AvifDecoder {
    fn format(&self) -> &'static str {
        "avif"
    }

    fn decode(&self, bytes: &[u8]) -> Option<PixelBuffer> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Avif)
            .map_err(|e| tracing::debug!(error = %e, "AVIF decode failed"))
            .ok()?
            .to_rgba8();

        Some(PixelBuffer {
            width: decoded.width(),
            height: decoded.height(),
            data: decoded.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_payload_is_not_decodable() {
        assert!(AvifDecoder.decode(b"\x00\x00\x00\x1cftypavif").is_none());
    }
}
