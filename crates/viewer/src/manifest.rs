//! Image manifest: a JSON array of descriptors.

use std::path::Path;

use anyhow::Context;
use imagepoly_core::ImageDescriptor;

/// Parse a manifest document.
pub fn parse_manifest(json: &str) -> Result<Vec<ImageDescriptor>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read and parse the manifest at `path`.
pub async fn load_manifest(path: &Path) -> anyhow::Result<Vec<ImageDescriptor>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;

    let descriptors = parse_manifest(&json)
        .with_context(|| format!("Invalid manifest {}", path.display()))?;

    tracing::info!(path = %path.display(), count = descriptors.len(), "Manifest loaded");
    Ok(descriptors)
}
