//! Pool sizing and drawing-surface limits.
//!
//! Pool sizes are fixed at build time; there is deliberately no runtime
//! override surface for them.

use crate::job::JobKind;

// ---------------------------------------------------------------------------
// Pool sizes
// ---------------------------------------------------------------------------

/// Number of execution units decoding blurhash placeholders.
///
/// Placeholders are tiny and arrive in bursts (one per visible thumbnail),
/// so this pool is wider than the image pool.
pub const BLURHASH_POOL_SIZE: usize = 4;

/// Number of execution units fetching and decoding exotic codecs.
pub const IMAGE_POOL_SIZE: usize = 2;

/// Slot count for a job kind.
pub fn pool_size(kind: JobKind) -> usize {
    match kind {
        JobKind::Blurhash => BLURHASH_POOL_SIZE,
        JobKind::Image => IMAGE_POOL_SIZE,
    }
}

// ---------------------------------------------------------------------------
// Offscreen surface limits
// ---------------------------------------------------------------------------

/// Largest width or height an offscreen surface may have.
pub const MAX_SURFACE_DIMENSION: u32 = 32_767;

/// Largest pixel count an offscreen surface may have (16384 x 16384).
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Whether a `width` x `height` surface can be allocated.
pub fn surface_fits(width: u32, height: u32) -> bool {
    width > 0
        && height > 0
        && width <= MAX_SURFACE_DIMENSION
        && height <= MAX_SURFACE_DIMENSION
        && u64::from(width) * u64::from(height) <= MAX_SURFACE_AREA
}

/// Contrast boost applied when expanding a blurhash. 1.0 keeps the
/// colours exactly as encoded.
pub const BLURHASH_PUNCH: f32 = 1.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_have_distinct_sizes() {
        assert_ne!(pool_size(JobKind::Blurhash), pool_size(JobKind::Image));
        assert!(pool_size(JobKind::Image) > 0);
    }

    #[test]
    fn zero_sized_surface_rejected() {
        assert!(!surface_fits(0, 10));
        assert!(!surface_fits(10, 0));
    }

    #[test]
    fn oversized_surface_rejected() {
        assert!(!surface_fits(MAX_SURFACE_DIMENSION + 1, 1));
        assert!(!surface_fits(20_000, 20_000));
    }

    #[test]
    fn ordinary_surface_accepted() {
        assert!(surface_fits(32, 32));
        assert!(surface_fits(16_384, 16_384));
    }
}
