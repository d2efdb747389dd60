//! Blurhash placeholder expansion.

use imagepoly_core::constants::{surface_fits, BLURHASH_PUNCH};
use imagepoly_core::{BlurhashPayload, DecodeError};

use crate::surface::{Blob, OffscreenSurface};

/// Expand a blurhash into an RGBA8 buffer of `width * height * 4` bytes.
///
/// Pure and deterministic: identical payloads yield identical buffers.
pub fn decode_blurhash_pixels(payload: &BlurhashPayload) -> Result<Vec<u8>, DecodeError> {
    let BlurhashPayload {
        hash,
        width,
        height,
    } = payload;

    // Refuse before allocating a buffer the surface could never hold.
    if !surface_fits(*width, *height) {
        return Err(DecodeError::ContextUnavailable {
            width: *width,
            height: *height,
        });
    }

    ::blurhash::decode(hash, *width, *height, BLURHASH_PUNCH)
        .map_err(|e| DecodeError::InvalidBlurhash(format!("{hash}: {e:?}")))
}

/// Expand a blurhash and serialise it to a PNG blob.
///
/// Blocking; callers run it on a blocking thread.
pub fn render_blurhash(payload: &BlurhashPayload) -> Result<Blob, DecodeError> {
    let pixels = decode_blurhash_pixels(payload)?;

    let mut surface = OffscreenSurface::new(payload.width, payload.height)?;
    surface.put_image_data(&pixels)?;
    surface.convert_to_blob()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const HASH: &str = "L6PZfSi:.AyE_3t7t7R**0o#DgR4";

    #[test]
    fn decoding_is_deterministic() {
        let payload = BlurhashPayload::new(HASH, 32, 32);
        let first = decode_blurhash_pixels(&payload).expect("valid hash");
        let second = decode_blurhash_pixels(&payload).expect("valid hash");

        assert_eq!(first.len(), 32 * 32 * 4);
        assert_eq!(first, second);
    }

    #[test]
    fn decoded_pixels_are_opaque() {
        let payload = BlurhashPayload::new(HASH, 8, 4);
        let pixels = decode_blurhash_pixels(&payload).expect("valid hash");
        assert!(pixels.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn zero_dimension_has_no_context() {
        let payload = BlurhashPayload::new(HASH, 0, 32);
        assert_matches!(
            render_blurhash(&payload),
            Err(DecodeError::ContextUnavailable { width: 0, height: 32 })
        );
    }

    #[test]
    fn truncated_hash_rejected() {
        let payload = BlurhashPayload::new("L6PZ", 16, 16);
        assert_matches!(
            decode_blurhash_pixels(&payload),
            Err(DecodeError::InvalidBlurhash(_))
        );
    }

    #[test]
    fn render_produces_png_of_requested_size() {
        let payload = BlurhashPayload::new(HASH, 20, 10);
        let blob = render_blurhash(&payload).expect("renders");

        let decoded = image::load_from_memory(&blob.bytes).expect("valid png");
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }
}
