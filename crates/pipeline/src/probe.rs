//! Native codec capability probing.
//!
//! At startup each exotic codec gets a tiny known-good sample pushed
//! through the native decode path. The outcome is frozen into a
//! [`CapabilityTable`] owned by a [`CapabilityService`]; the renderer asks
//! the service whether a format needs a polyfill.

use std::sync::Arc;

use async_trait::async_trait;
use imagepoly_core::ExoticFormat;
use serde::Serialize;
use tokio::sync::OnceCell;

/// 1x1 AVIF still image.
pub const AVIF_SAMPLE: &[u8] = include_bytes!("../assets/probe/sample.avif");

/// 1x2 JPEG XL codestream.
pub const JXL_SAMPLE: &[u8] = include_bytes!("../assets/probe/sample.jxl");

/// The probe sample for `format`.
pub fn sample(format: ExoticFormat) -> &'static [u8] {
    match format {
        ExoticFormat::Avif => AVIF_SAMPLE,
        ExoticFormat::Jxl => JXL_SAMPLE,
    }
}

// ---------------------------------------------------------------------------
// Probers
// ---------------------------------------------------------------------------

/// Decides whether one exotic codec decodes natively.
///
/// Implementations must not fail: anything that goes wrong means `false`.
#[async_trait]
pub trait FormatProber: Send + Sync + 'static {
    async fn probe(&self, format: ExoticFormat) -> bool;
}

/// Probes through the `image` crate's built-in decoders.
///
/// Which codecs succeed depends on the `image` features compiled in; a
/// format the crate has no name for is unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateProber;

#[async_trait]
impl FormatProber for ImageCrateProber {
    async fn probe(&self, format: ExoticFormat) -> bool {
        let Some(image_format) = image::ImageFormat::from_extension(format.tag()) else {
            tracing::debug!(%format, "No native decoder for format");
            return false;
        };

        let decoded = tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(sample(format), image_format).map(|_| ())
        })
        .await;

        match decoded {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(%format, error = %e, "Native probe failed");
                false
            }
            Err(e) => {
                tracing::debug!(%format, error = %e, "Native probe task failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityTable
// ---------------------------------------------------------------------------

/// Which exotic codecs decode natively. Frozen once probed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityTable {
    pub avif: bool,
    pub jxl: bool,
}

impl CapabilityTable {
    /// A table with known answers.
    pub fn new(avif: bool, jxl: bool) -> Self {
        Self { avif, jxl }
    }

    /// Whether `format` decodes natively.
    pub fn supports(&self, format: ExoticFormat) -> bool {
        match format {
            ExoticFormat::Avif => self.avif,
            ExoticFormat::Jxl => self.jxl,
        }
    }

    /// Whether a format tag decodes natively. Non-exotic tags always do.
    pub fn is_native(&self, format: &str) -> bool {
        ExoticFormat::from_tag(format).map_or(true, |f| self.supports(f))
    }

    /// Run every probe concurrently and collect the results.
    pub async fn probe(prober: &dyn FormatProber) -> Self {
        let results =
            futures::future::join_all(ExoticFormat::ALL.iter().map(|f| prober.probe(*f))).await;

        let mut table = Self::default();
        for (format, supported) in ExoticFormat::ALL.iter().zip(results) {
            match format {
                ExoticFormat::Avif => table.avif = supported,
                ExoticFormat::Jxl => table.jxl = supported,
            }
        }
        table
    }
}

// ---------------------------------------------------------------------------
// CapabilityService
// ---------------------------------------------------------------------------

/// Owns the capability table and the one probe run that fills it.
///
/// Cheap to clone; clones share the table. Callers that ask before the
/// probe has finished wait for that same probe rather than starting
/// another one.
#[derive(Clone)]
pub struct CapabilityService {
    table: Arc<OnceCell<CapabilityTable>>,
    prober: Arc<dyn FormatProber>,
}

impl CapabilityService {
    /// Build the service and start probing in the background.
    pub fn start(prober: Arc<dyn FormatProber>) -> Self {
        let service = Self::lazy(prober);
        let background = service.clone();
        tokio::spawn(async move {
            let table = background.table().await;
            tracing::info!(avif = table.avif, jxl = table.jxl, "Native codec support probed");
        });
        service
    }

    /// Build the service without probing; the first query runs the probe.
    pub fn lazy(prober: Arc<dyn FormatProber>) -> Self {
        Self {
            table: Arc::new(OnceCell::new()),
            prober,
        }
    }

    /// A service with a known table and no probing at all.
    pub fn with_table(table: CapabilityTable) -> Self {
        Self {
            table: Arc::new(OnceCell::new_with(Some(table))),
            prober: Arc::new(ImageCrateProber),
        }
    }

    /// The probed table, waiting for the probe if it is still running.
    pub async fn table(&self) -> CapabilityTable {
        *self
            .table
            .get_or_init(|| CapabilityTable::probe(self.prober.as_ref()))
            .await
    }

    /// Whether `format` decodes natively. Waits for the probe.
    pub async fn is_native(&self, format: &str) -> bool {
        self.table().await.is_native(format)
    }

    /// Non-blocking variant of [`is_native`](Self::is_native): `None` while
    /// the probe is still in flight.
    pub fn peek(&self, format: &str) -> Option<bool> {
        self.table.get().map(|table| table.is_native(format))
    }
}

impl std::fmt::Debug for CapabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityService")
            .field("table", &self.table.get())
            .finish()
    }
}
