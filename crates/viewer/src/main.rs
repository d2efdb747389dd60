//! `imagepoly-viewer` -- renders a manifest of images through the
//! decode pipeline and writes the decoded bitmaps to disk.
//!
//! Usage: `imagepoly-viewer [manifest.json]`
//!
//! # Environment variables
//!
//! | Variable                        | Required | Default      | Description                          |
//! |---------------------------------|----------|--------------|--------------------------------------|
//! | `IMAGEPOLY_MANIFEST`            | no*      | --           | Manifest path (*unless given as argument) |
//! | `IMAGEPOLY_TOKEN`               | no       | empty        | Bearer token for image fetches       |
//! | `IMAGEPOLY_OUTPUT_DIR`          | no       | `./rendered` | Where decoded PNGs are written       |
//! | `IMAGEPOLY_TOPOLOGY`            | no       | `auto`       | `auto`, `dedicated` or `shared`      |
//! | `IMAGEPOLY_RENDER_TIMEOUT_SECS` | no       | `60`         | How long to wait for all images      |
//! | `IMAGEPOLY_FETCH_TIMEOUT_SECS`  | no       | `30`         | HTTP client timeout                  |

use std::sync::Arc;

use anyhow::Context;
use imagepoly_decode::{BlobStore, DecodePipeline, DecoderRegistry, ImageFetcher};
use imagepoly_pipeline::{CapabilityService, Environment, ImageCrateProber, Renderer};
use imagepoly_viewer::config::ViewerConfig;
use imagepoly_viewer::{manifest, session};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imagepoly_viewer=info,imagepoly_pipeline=info,imagepoly_worker=info,imagepoly_decode=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ViewerConfig::from_env(std::env::args().nth(1))?;
    let descriptors = manifest::load_manifest(&config.manifest).await?;

    let fetcher = ImageFetcher::new(config.fetch_timeout).context("Failed to build HTTP client")?;
    let pipeline = DecodePipeline::new(fetcher, DecoderRegistry::with_defaults(), BlobStore::new());
    let capabilities = CapabilityService::start(Arc::new(ImageCrateProber));
    let renderer = Renderer::new(
        Arc::new(pipeline.clone()),
        capabilities,
        Environment::detect(),
        config.topology,
    );

    tracing::info!(
        images = descriptors.len(),
        topology = %renderer.topology(),
        timeout_secs = config.render_timeout.as_secs(),
        "Starting imagepoly-viewer",
    );

    let results =
        session::render_all(&renderer, descriptors, &config.token, config.render_timeout).await;
    let written = session::write_outputs(pipeline.blobs(), &config.output_dir, &results).await?;

    session::log_summary(&results);
    tracing::info!(written, output_dir = %config.output_dir.display(), "Blobs written");
    Ok(())
}
