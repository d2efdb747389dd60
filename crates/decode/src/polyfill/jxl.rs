//! JPEG XL decoding through `jxl-oxide`.

use std::io::Cursor;

use jxl_oxide::JxlImage;

use super::{PixelBuffer, PolyfillDecoder};

/// Pure-Rust JPEG XL decoder. Renders the first keyframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct JxlDecoder;

impl PolyfillDecoder for JxlDecoder {
    fn format(&self) -> &'static str {
        "jxl"
    }

    fn decode(&self, bytes: &[u8]) -> Option<PixelBuffer> {
        let image = JxlImage::builder()
            .read(Cursor::new(bytes))
            .map_err(|e| tracing::debug!(error = %e, "Failed to read JPEG XL header"))
            .ok()?;

        let render = image
            .render_frame(0)
            .map_err(|e| tracing::debug!(error = %e, "Failed to render JPEG XL frame"))
            .ok()?;

        let frame = render.image_all_channels();
        let width = u32::try_from(frame.width()).ok()?;
        let height = u32::try_from(frame.height()).ok()?;

        Some(PixelBuffer {
            width,
            height,
            data: interleaved_to_rgba8(frame.buf(), frame.channels()),
        })
    }
}

/// Convert interleaved `[0, 1]` float samples to RGBA8.
///
/// One channel is grey, two are grey + alpha, three are RGB, four or more
/// are RGBA followed by extra channels, which are dropped.
pub fn interleaved_to_rgba8(samples: &[f32], channels: usize) -> Vec<u8> {
    if channels == 0 {
        return Vec::new();
    }

    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut out = Vec::with_capacity(samples.len() / channels * 4);

    for px in samples.chunks_exact(channels) {
        let rgba = match channels {
            1 => [px[0], px[0], px[0], 1.0],
            2 => [px[0], px[0], px[0], px[1]],
            3 => [px[0], px[1], px[2], 1.0],
            _ => [px[0], px[1], px[2], px[3]],
        };
        out.extend(rgba.map(to_u8));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_expands_to_opaque_rgba() {
        assert_eq!(interleaved_to_rgba8(&[0.0, 1.0], 1), vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn grey_alpha_keeps_alpha() {
        assert_eq!(interleaved_to_rgba8(&[1.0, 0.0], 2), vec![255, 255, 255, 0]);
    }

    #[test]
    fn rgb_gets_opaque_alpha_and_clamps() {
        assert_eq!(interleaved_to_rgba8(&[1.5, 0.5, -0.2], 3), vec![255, 128, 0, 255]);
    }

    #[test]
    fn extra_channels_dropped() {
        assert_eq!(
            interleaved_to_rgba8(&[0.0, 0.0, 1.0, 1.0, 0.3], 5),
            vec![0, 0, 255, 255]
        );
    }

    #[test]
    fn garbage_is_not_decodable() {
        assert!(JxlDecoder.decode(b"definitely not a jxl codestream").is_none());
    }
}
