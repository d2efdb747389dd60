//! Offscreen RGBA drawing surface that serialises to a PNG blob.

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use imagepoly_core::constants::surface_fits;
use imagepoly_core::DecodeError;

/// Encoded image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: &'static str,
    pub bytes: Arc<[u8]>,
}

impl Blob {
    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoding is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An in-memory 2D surface, the stand-in for an `OffscreenCanvas`.
#[derive(Debug)]
pub struct OffscreenSurface {
    canvas: RgbaImage,
}

impl OffscreenSurface {
    /// Allocate a transparent surface.
    ///
    /// Fails with [`DecodeError::ContextUnavailable`] for zero-sized or
    /// oversized dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, DecodeError> {
        if !surface_fits(width, height) {
            return Err(DecodeError::ContextUnavailable { width, height });
        }
        Ok(Self {
            canvas: RgbaImage::new(width, height),
        })
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Copy a full-surface RGBA8 buffer onto the surface at the origin.
    pub fn put_image_data(&mut self, rgba: &[u8]) -> Result<(), DecodeError> {
        let expected = self.canvas.len();
        if rgba.len() != expected {
            return Err(DecodeError::PixelBufferMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        self.canvas.copy_from_slice(rgba);
        Ok(())
    }

    /// Serialise the surface as a PNG blob.
    pub fn convert_to_blob(&self) -> Result<Blob, DecodeError> {
        let mut bytes = Vec::new();
        self.canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| DecodeError::Encode(e.to_string()))?;

        Ok(Blob {
            mime_type: "image/png",
            bytes: bytes.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn zero_width_has_no_context() {
        assert_matches!(
            OffscreenSurface::new(0, 4),
            Err(DecodeError::ContextUnavailable { width: 0, height: 4 })
        );
    }

    #[test]
    fn mismatched_buffer_rejected() {
        let mut surface = OffscreenSurface::new(2, 2).expect("2x2 fits");
        assert_matches!(
            surface.put_image_data(&[0u8; 15]),
            Err(DecodeError::PixelBufferMismatch {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn blob_is_a_png_of_the_surface() {
        let mut surface = OffscreenSurface::new(2, 1).expect("2x1 fits");
        surface
            .put_image_data(&[255, 0, 0, 255, 0, 0, 255, 255])
            .expect("exact size");

        let blob = surface.convert_to_blob().expect("png encode");
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(&blob.bytes[..8], &PNG_SIGNATURE);

        let decoded = image::load_from_memory(&blob.bytes)
            .expect("valid png")
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }
}
