//! Fetch-then-polyfill decoding of exotic images.

use imagepoly_core::{DecodeError, ImagePayload};

use crate::fetch::{FetchOutcome, ImageFetcher};
use crate::polyfill::DecoderRegistry;
use crate::surface::{Blob, OffscreenSurface};
use crate::join_failure;

/// What an image job ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The image was decoded and re-encoded as a displayable blob.
    Decoded(Blob),
    /// The fetch failed; the UI gets the original source back.
    Fallback(String),
}

/// Fetch `payload.source` and decode it with the polyfill for its format.
///
/// The decoder is resolved first, so an unknown format fails with
/// [`DecodeError::UnknownFormat`] without touching the network. A fetch
/// that does not produce a 2xx body degrades to
/// [`ImageOutcome::Fallback`] instead of failing.
pub async fn decode_image(
    fetcher: &ImageFetcher,
    registry: &DecoderRegistry,
    payload: &ImagePayload,
) -> Result<ImageOutcome, DecodeError> {
    let decoder = registry.lookup(&payload.format)?;

    let bytes = match fetcher.fetch(&payload.source, &payload.auth_token).await {
        Ok(FetchOutcome::Body(bytes)) => bytes,
        Ok(FetchOutcome::Status(status)) => {
            tracing::warn!(
                src = %payload.source,
                status,
                "Image fetch returned an error status, falling back to source",
            );
            return Ok(ImageOutcome::Fallback(payload.source.clone()));
        }
        Err(e) => {
            tracing::warn!(
                src = %payload.source,
                error = %e,
                "Image fetch failed, falling back to source",
            );
            return Ok(ImageOutcome::Fallback(payload.source.clone()));
        }
    };

    let format = payload.format.clone();
    let blob = tokio::task::spawn_blocking(move || -> Result<Blob, DecodeError> {
        let pixels = decoder
            .decode(&bytes)
            .ok_or(DecodeError::Undecodable { format })?;

        let mut surface = OffscreenSurface::new(pixels.width, pixels.height)?;
        surface.put_image_data(&pixels.data)?;
        surface.convert_to_blob()
    })
    .await
    .map_err(join_failure)??;

    Ok(ImageOutcome::Decoded(blob))
}
