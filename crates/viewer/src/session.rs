//! One viewer run: render every descriptor, wait, write blobs, report.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use imagepoly_core::{sink, ImageDescriptor, RenderState, SessionToken, SinkReader};
use imagepoly_decode::blob::is_blob_url;
use imagepoly_decode::BlobStore;
use imagepoly_pipeline::Renderer;
use tokio::time::Instant;

/// How an image ended up being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Shown from its source; the platform decodes the format itself.
    Native,
    /// Decoded by a polyfill into the given blob.
    Decoded(String),
    /// Needed a polyfill but the fetch failed; shown from its source.
    Fallback,
    Failed(String),
    /// Nothing arrived before the render timeout.
    Pending,
}

impl Outcome {
    /// Classify the final image state. `native` is the capability answer
    /// for the descriptor's format, if known.
    pub fn classify(state: &RenderState, native: Option<bool>) -> Self {
        match state {
            RenderState::Pending => Self::Pending,
            RenderState::Failed { reason } => Self::Failed(reason.clone()),
            RenderState::Ready(locator) if is_blob_url(locator) => Self::Decoded(locator.clone()),
            RenderState::Ready(_) if native == Some(false) => Self::Fallback,
            RenderState::Ready(_) => Self::Native,
        }
    }

    /// Short lowercase name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Decoded(_) => "decoded",
            Self::Fallback => "fallback",
            Self::Failed(_) => "failed",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final state of one descriptor.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub descriptor: ImageDescriptor,
    /// `Pending` when the descriptor has no placeholder.
    pub placeholder: RenderState,
    pub image: RenderState,
    pub outcome: Outcome,
}

/// Render every descriptor and wait until all sinks settle or `timeout`
/// elapses, whichever comes first.
pub async fn render_all(
    renderer: &Renderer,
    descriptors: Vec<ImageDescriptor>,
    token: &SessionToken,
    timeout: Duration,
) -> Vec<RenderedImage> {
    let deadline = Instant::now() + timeout;

    let started: Vec<_> = descriptors
        .into_iter()
        .map(|descriptor| {
            let (blurhash_sink, blurhash) = sink::channel();
            let (image_sink, image) = sink::channel();
            renderer.render(&descriptor, blurhash_sink, image_sink, token.clone());
            (descriptor, blurhash, image)
        })
        .collect();

    futures::future::join_all(started.into_iter().map(|(descriptor, mut blurhash, mut image)| {
        async move {
            let image = settle_by(&mut image, deadline).await;
            let placeholder = if descriptor.placeholder().is_some() {
                settle_by(&mut blurhash, deadline).await
            } else {
                RenderState::Pending
            };
            let native = renderer.capabilities().peek(&descriptor.format);

            RenderedImage {
                outcome: Outcome::classify(&image, native),
                descriptor,
                placeholder,
                image,
            }
        }
    }))
    .await
}

async fn settle_by(reader: &mut SinkReader, deadline: Instant) -> RenderState {
    match tokio::time::timeout_at(deadline, reader.settled()).await {
        Ok(state) => state,
        Err(_) => reader.current(),
    }
}

/// Write every blob-backed result as `NNN-blurhash.png` / `NNN-image.png`
/// into `output_dir`. Returns the number of files written.
pub async fn write_outputs(
    blobs: &BlobStore,
    output_dir: &Path,
    results: &[RenderedImage],
) -> anyhow::Result<usize> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = 0;
    for (index, result) in results.iter().enumerate() {
        for (label, state) in [("blurhash", &result.placeholder), ("image", &result.image)] {
            let Some(url) = state.locator().filter(|l| is_blob_url(l)) else {
                continue;
            };
            let Some(blob) = blobs.resolve(url) else {
                tracing::warn!(%url, "Blob was revoked before it could be written");
                continue;
            };

            let path = output_dir.join(format!("{index:03}-{label}.png"));
            tokio::fs::write(&path, &blob.bytes[..])
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
    }
    Ok(written)
}

/// One log line per image, then totals.
pub fn log_summary(results: &[RenderedImage]) {
    let mut counts = [0usize; 5];
    for (index, result) in results.iter().enumerate() {
        let src = &result.descriptor.src;
        let format = &result.descriptor.format;
        match &result.outcome {
            Outcome::Failed(reason) => {
                tracing::warn!(index, %src, %format, outcome = "failed", %reason, "Image failed");
            }
            outcome => {
                tracing::info!(index, %src, %format, outcome = %outcome, "Image rendered");
            }
        }

        let slot = match result.outcome {
            Outcome::Native => 0,
            Outcome::Decoded(_) => 1,
            Outcome::Fallback => 2,
            Outcome::Failed(_) => 3,
            Outcome::Pending => 4,
        };
        counts[slot] += 1;
    }

    let [native, decoded, fallback, failed, pending] = counts;
    tracing::info!(native, decoded, fallback, failed, pending, "Render summary");
}
