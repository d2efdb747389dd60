//! Process-wide registry of decoded blobs, addressed by opaque URLs.
//!
//! Mirrors `URL.createObjectURL` / `URL.revokeObjectURL`: execution units
//! register the PNG they produced and hand the returned `blob:` locator to
//! the UI, which resolves it when drawing.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::surface::Blob;

/// Prefix of every locator handed out by [`BlobStore::create_object_url`].
pub const BLOB_URL_PREFIX: &str = "blob:imagepoly/";

/// Shared blob registry. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: Arc<RwLock<HashMap<String, Blob>>>,
}

impl BlobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `blob` and return a fresh locator for it.
    pub fn create_object_url(&self, blob: Blob) -> String {
        let url = format!("{BLOB_URL_PREFIX}{}", uuid::Uuid::new_v4());
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), blob);
        url
    }

    /// The blob behind `url`, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Drop the blob behind `url`. Returns whether it existed.
    pub fn revoke(&self, url: &str) -> bool {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
            .is_some()
    }

    /// Number of live blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no blobs are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a locator was minted by a [`BlobStore`].
pub fn is_blob_url(locator: &str) -> bool {
    locator.starts_with(BLOB_URL_PREFIX)
}
