//! The render façade the UI calls once per image.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use imagepoly_core::{
    BlurhashPayload, DecodeError, ImageDescriptor, ImagePayload, JobExecutor, SessionToken, Sink,
};
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::probe::CapabilityService;
use crate::strategy::{DedicatedStrategy, RenderStrategy, SharedStrategy};

// ---------------------------------------------------------------------------
// Topology selection
// ---------------------------------------------------------------------------

/// Which worker topology a renderer dispatches through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Dedicated,
    Shared,
}

impl Topology {
    /// Pick a topology: an explicit preference wins, otherwise shared when
    /// the environment supports it.
    pub fn select(env: Environment, preference: TopologyPreference) -> Self {
        match preference {
            TopologyPreference::Dedicated => Self::Dedicated,
            TopologyPreference::Shared => Self::Shared,
            TopologyPreference::Auto if env.shared_context => Self::Shared,
            TopologyPreference::Auto => Self::Dedicated,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dedicated => f.write_str("dedicated"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Caller override for [`Topology::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopologyPreference {
    #[default]
    Auto,
    Dedicated,
    Shared,
}

impl TopologyPreference {
    /// Parse `auto`, `dedicated` or `shared` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "dedicated" => Some(Self::Dedicated),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

/// What the host can offer the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// Whether pools can be shared between concurrently running clients.
    pub shared_context: bool,
}

impl Environment {
    /// Shared pools are worth it only when their clients can actually run
    /// in parallel, i.e. on a multi-threaded runtime.
    pub fn detect() -> Self {
        let shared_context = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        Self { shared_context }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Routes each image to its placeholder and full-image paths.
///
/// Cheap to clone; clones share one deferral queue, so image jobs keep
/// call order across them. Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct Renderer {
    strategy: Arc<dyn RenderStrategy>,
    capabilities: CapabilityService,
    deferred: Arc<Deferral>,
}

/// An image request that has to wait for the capability probe.
struct DeferredImage {
    payload: ImagePayload,
    sink: Sink,
}

/// Ordered queue of image requests made while the probe was running.
///
/// One task drains it, so deferred requests reach the strategy in the
/// order `render` was called. `outstanding` counts requests that are
/// queued but not yet routed; while it is non-zero new requests queue
/// behind them even if the probe has already finished.
#[derive(Default)]
struct Deferral {
    queue: OnceLock<mpsc::UnboundedSender<DeferredImage>>,
    outstanding: Arc<AtomicUsize>,
}

impl Renderer {
    /// Choose a topology once and build its strategy.
    pub fn new(
        executor: Arc<dyn JobExecutor>,
        capabilities: CapabilityService,
        env: Environment,
        preference: TopologyPreference,
    ) -> Self {
        let topology = Topology::select(env, preference);
        tracing::info!(%topology, ?preference, "Renderer topology selected");

        let strategy: Arc<dyn RenderStrategy> = match topology {
            Topology::Dedicated => Arc::new(DedicatedStrategy::new(executor)),
            Topology::Shared => Arc::new(SharedStrategy::start(executor)),
        };
        Self::with_strategy(strategy, capabilities)
    }

    /// Use an already-built strategy, e.g. shared pools another renderer
    /// also talks to.
    pub fn with_strategy(strategy: Arc<dyn RenderStrategy>, capabilities: CapabilityService) -> Self {
        Self {
            strategy,
            capabilities,
            deferred: Arc::new(Deferral::default()),
        }
    }

    /// The topology jobs are dispatched through.
    pub fn topology(&self) -> Topology {
        self.strategy.topology()
    }

    /// The capability service consulted per image.
    pub fn capabilities(&self) -> &CapabilityService {
        &self.capabilities
    }

    /// Start rendering `descriptor`. Returns immediately.
    ///
    /// The placeholder job (if the descriptor has one) is queued before
    /// this returns. The image sink gets the source itself when the format
    /// decodes natively, otherwise the result of a decode job carrying
    /// `token`. A descriptor without a placeholder leaves `blurhash_sink`
    /// untouched.
    ///
    /// Once capabilities are known the image path is decided before this
    /// returns. Earlier, the request waits in an ordered queue, so image
    /// jobs are always submitted in call order.
    pub fn render(
        &self,
        descriptor: &ImageDescriptor,
        blurhash_sink: Sink,
        image_sink: Sink,
        token: SessionToken,
    ) {
        if let Some((hash, width, height)) = descriptor.placeholder() {
            self.strategy
                .submit_blurhash(BlurhashPayload::new(hash, width, height), blurhash_sink);
        }

        let payload = ImagePayload::new(descriptor.src.clone(), descriptor.format.clone(), token);
        match self.capabilities.peek(&descriptor.format) {
            Some(native) if self.deferred.outstanding.load(Ordering::Acquire) == 0 => {
                route_image(self.strategy.as_ref(), payload, image_sink, native);
            }
            _ => self.defer(payload, image_sink),
        }
    }

    fn defer(&self, payload: ImagePayload, sink: Sink) {
        let queue = self.deferred.queue.get_or_init(|| self.spawn_deferral());
        self.deferred.outstanding.fetch_add(1, Ordering::AcqRel);

        if let Err(mpsc::error::SendError(request)) = queue.send(DeferredImage { payload, sink }) {
            self.deferred.outstanding.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(src = %request.payload.source, "Deferral queue closed, dropping image");
            request.sink.complete(Err(DecodeError::WorkerLost));
        }
    }

    fn spawn_deferral(&self) -> mpsc::UnboundedSender<DeferredImage> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DeferredImage>();
        let strategy = Arc::clone(&self.strategy);
        let capabilities = self.capabilities.clone();
        let outstanding = Arc::clone(&self.deferred.outstanding);

        tokio::spawn(async move {
            while let Some(DeferredImage { payload, sink }) = rx.recv().await {
                let native = capabilities.is_native(&payload.format).await;
                route_image(strategy.as_ref(), payload, sink, native);
                outstanding.fetch_sub(1, Ordering::AcqRel);
            }
        });
        tx
    }
}

/// Publish the source for native formats, otherwise queue a decode.
fn route_image(strategy: &dyn RenderStrategy, payload: ImagePayload, sink: Sink, native: bool) {
    if native {
        tracing::debug!(src = %payload.source, format = %payload.format, "Native format, no decode needed");
        sink.ready(payload.source);
        return;
    }

    tracing::debug!(src = %payload.source, format = %payload.format, "Queueing polyfill decode");
    strategy.submit_image(payload, sink);
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("topology", &self.topology())
            .field("capabilities", &self.capabilities)
            .field("deferred", &self.deferred.outstanding.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARED: Environment = Environment {
        shared_context: true,
    };
    const SINGLE: Environment = Environment {
        shared_context: false,
    };

    #[test]
    fn auto_follows_environment() {
        assert_eq!(Topology::select(SHARED, TopologyPreference::Auto), Topology::Shared);
        assert_eq!(Topology::select(SINGLE, TopologyPreference::Auto), Topology::Dedicated);
    }

    #[test]
    fn explicit_preference_wins() {
        assert_eq!(
            Topology::select(SHARED, TopologyPreference::Dedicated),
            Topology::Dedicated
        );
        assert_eq!(Topology::select(SINGLE, TopologyPreference::Shared), Topology::Shared);
    }

    #[test]
    fn preference_names() {
        assert_eq!(TopologyPreference::from_name("Shared"), Some(TopologyPreference::Shared));
        assert_eq!(TopologyPreference::from_name(" auto "), Some(TopologyPreference::Auto));
        assert_eq!(TopologyPreference::from_name("worker"), None);
    }

    #[test]
    fn no_runtime_means_no_shared_context() {
        assert!(!Environment::detect().shared_context);
    }

    #[tokio::test]
    async fn current_thread_runtime_is_not_shared() {
        assert!(!Environment::detect().shared_context);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_thread_runtime_is_shared() {
        assert!(Environment::detect().shared_context);
    }
}
