//! Decode functions for the ImagePoly pipeline.
//!
//! Turns job payloads into displayable locators:
//!
//! - [`placeholder`]: blurhash → RGBA → PNG blob.
//! - [`exotic`]: authenticated fetch → polyfill decoder → PNG blob, with
//!   fallback to the original source when the fetch fails.
//! - [`surface`] / [`blob`]: offscreen surface and the blob registry the
//!   resulting `blob:` locators point into.
//!
//! [`DecodePipeline`] bundles these behind the
//! [`JobExecutor`](imagepoly_core::JobExecutor) seam used by the pools.

pub mod blob;
pub mod exotic;
pub mod fetch;
pub mod placeholder;
pub mod polyfill;
pub mod surface;

use async_trait::async_trait;
use imagepoly_core::{BlurhashPayload, DecodeError, ImagePayload, JobExecutor, JobPayload};
use tokio::task::JoinError;

pub use blob::BlobStore;
pub use exotic::ImageOutcome;
pub use fetch::ImageFetcher;
pub use polyfill::{DecoderRegistry, PixelBuffer, PolyfillDecoder};

/// Everything a decode job needs: HTTP client, polyfill decoders, and the
/// blob registry results are published into.
#[derive(Debug, Clone)]
pub struct DecodePipeline {
    fetcher: ImageFetcher,
    registry: DecoderRegistry,
    blobs: BlobStore,
}

impl DecodePipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(fetcher: ImageFetcher, registry: DecoderRegistry, blobs: BlobStore) -> Self {
        Self {
            fetcher,
            registry,
            blobs,
        }
    }

    /// Default fetcher and decoders, fresh blob store.
    pub fn with_defaults() -> Self {
        Self::new(
            ImageFetcher::default(),
            DecoderRegistry::with_defaults(),
            BlobStore::new(),
        )
    }

    /// The store every `blob:` locator resolves against.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Expand a blurhash and return the `blob:` locator of the PNG.
    pub async fn decode_blurhash(&self, payload: BlurhashPayload) -> Result<String, DecodeError> {
        let blob = tokio::task::spawn_blocking(move || placeholder::render_blurhash(&payload))
            .await
            .map_err(join_failure)??;

        Ok(self.blobs.create_object_url(blob))
    }

    /// Fetch and decode an exotic image.
    ///
    /// Returns a `blob:` locator, or the original source when the fetch
    /// did not succeed.
    pub async fn decode_image(&self, payload: ImagePayload) -> Result<String, DecodeError> {
        match exotic::decode_image(&self.fetcher, &self.registry, &payload).await? {
            ImageOutcome::Decoded(blob) => Ok(self.blobs.create_object_url(blob)),
            ImageOutcome::Fallback(source) => Ok(source),
        }
    }
}

#[async_trait]
impl JobExecutor for DecodePipeline {
    async fn execute(&self, payload: JobPayload) -> Result<String, DecodeError> {
        match payload {
            JobPayload::Blurhash(p) => self.decode_blurhash(p).await,
            JobPayload::Image(p) => self.decode_image(p).await,
        }
    }
}

/// Map a failed blocking task onto the decode error taxonomy.
pub(crate) fn join_failure(e: JoinError) -> DecodeError {
    if e.is_panic() {
        DecodeError::Panicked(e.to_string())
    } else {
        DecodeError::WorkerLost
    }
}
