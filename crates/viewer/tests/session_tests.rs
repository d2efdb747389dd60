//! Integration tests for a full viewer session.

use std::sync::Arc;
use std::time::Duration;

use imagepoly_core::SessionToken;
use imagepoly_decode::DecodePipeline;
use imagepoly_pipeline::{
    CapabilityService, CapabilityTable, Environment, Renderer, TopologyPreference,
};
use imagepoly_viewer::manifest::parse_manifest;
use imagepoly_viewer::session::{log_summary, render_all, write_outputs, Outcome};

const MANIFEST: &str = r#"[
    {"src": "/files/1.png", "format": "png", "width": 16, "height": 16, "blurhash": "L6PZfSi:.AyE_3t7t7R**0o#DgR4"},
    {"src": "/files/2.avif", "format": "avif"},
    {"src": "/files/3.jxl", "format": "jxl"},
    {"src": "/files/4.png", "format": "png", "width": 0, "height": 16, "blurhash": "L6PZfSi:.AyE_3t7t7R**0o#DgR4"}
]"#;

fn renderer(pipeline: &DecodePipeline) -> Renderer {
    Renderer::new(
        Arc::new(pipeline.clone()),
        CapabilityService::with_table(CapabilityTable::new(true, false)),
        Environment::default(),
        TopologyPreference::Dedicated,
    )
}

// ---------------------------------------------------------------------------
// render_all
// ---------------------------------------------------------------------------

/// Every descriptor is classified, and relative sources that cannot be
/// fetched fall back.
#[tokio::test]
async fn classifies_each_image() {
    let pipeline = DecodePipeline::with_defaults();
    let descriptors = parse_manifest(MANIFEST).expect("valid manifest");

    let results = render_all(
        &renderer(&pipeline),
        descriptors,
        &SessionToken::new("jwt"),
        Duration::from_secs(10),
    )
    .await;

    let outcomes: Vec<_> = results.iter().map(|r| r.outcome.label()).collect();
    assert_eq!(outcomes, vec!["native", "native", "fallback", "native"]);

    assert!(results[0].placeholder.locator().is_some());
    assert!(results[1].placeholder.is_pending());
    // Zero-width placeholder cannot get a drawing surface.
    assert!(matches!(results[3].placeholder, imagepoly_core::RenderState::Failed { .. }));

    log_summary(&results);
}

// ---------------------------------------------------------------------------
// write_outputs
// ---------------------------------------------------------------------------

/// Only blob-backed results are written to disk, as PNG files.
#[tokio::test]
async fn writes_blob_results_only() {
    let pipeline = DecodePipeline::with_defaults();
    let descriptors = parse_manifest(MANIFEST).expect("valid manifest");
    let results = render_all(
        &renderer(&pipeline),
        descriptors,
        &SessionToken::default(),
        Duration::from_secs(10),
    )
    .await;

    let dir = std::env::temp_dir().join(format!("imagepoly-viewer-{}", uuid::Uuid::new_v4()));
    let written = write_outputs(pipeline.blobs(), &dir, &results)
        .await
        .expect("writable");

    assert_eq!(written, 1);
    let png = std::fs::read(dir.join("000-blurhash.png")).expect("placeholder written");
    assert_eq!(&png[1..4], b"PNG");

    std::fs::remove_dir_all(&dir).ok();
}

/// A session that cannot finish in time reports what it has.
#[tokio::test]
async fn timeout_leaves_images_pending() {
    // Accepts connections into the backlog but never answers.
    let silent = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = silent.local_addr().expect("addr");

    let pipeline = DecodePipeline::with_defaults();
    let manifest = format!(r#"[{{"src": "http://{addr}/slow.jxl", "format": "jxl"}}]"#);
    let descriptors = parse_manifest(&manifest).expect("valid manifest");

    let results = render_all(
        &renderer(&pipeline),
        descriptors,
        &SessionToken::default(),
        Duration::from_millis(50),
    )
    .await;

    assert_eq!(results[0].outcome, Outcome::Pending);
    drop(silent);
}
