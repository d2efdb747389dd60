//! Worker topologies the renderer can dispatch through.
//!
//! [`DedicatedStrategy`] owns private [`WorkerPool`]s: the blurhash pool
//! starts with the strategy, the image pool only when the first image
//! actually needs a polyfill. [`SharedStrategy`] talks to [`SharedPool`]s
//! that several renderers may have connected to.

use std::sync::{Arc, OnceLock};

use imagepoly_core::{
    BlurhashPayload, DecodeError, ImagePayload, Job, JobExecutor, JobKind, JobPayload, Sink,
};
use imagepoly_worker::{SharedPool, WorkerPool};

use crate::renderer::Topology;

/// Where decode jobs go once the renderer has decided they are needed.
pub trait RenderStrategy: Send + Sync + 'static {
    /// Queue a placeholder expansion whose result goes to `sink`.
    fn submit_blurhash(&self, payload: BlurhashPayload, sink: Sink);

    /// Queue a fetch-and-decode whose result goes to `sink`.
    fn submit_image(&self, payload: ImagePayload, sink: Sink);

    fn topology(&self) -> Topology;
}

// ---------------------------------------------------------------------------
// Dedicated
// ---------------------------------------------------------------------------

/// Private pools, one per job kind.
pub struct DedicatedStrategy {
    executor: Arc<dyn JobExecutor>,
    blurhash: WorkerPool,
    image: OnceLock<WorkerPool>,
}

impl DedicatedStrategy {
    /// Start the blurhash pool now; the image pool waits for its first job.
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            blurhash: WorkerPool::new(JobKind::Blurhash, Arc::clone(&executor)),
            image: OnceLock::new(),
            executor,
        }
    }

    /// The eagerly started placeholder pool.
    pub fn blurhash_pool(&self) -> &WorkerPool {
        &self.blurhash
    }

    /// The image pool, if it has been spun up.
    pub fn image_pool(&self) -> Option<&WorkerPool> {
        self.image.get()
    }

    /// Whether any image has needed a polyfill yet.
    pub fn image_pool_started(&self) -> bool {
        self.image.get().is_some()
    }

    fn image_pool_or_start(&self) -> &WorkerPool {
        self.image.get_or_init(|| {
            tracing::info!("Spinning up image decode pool");
            WorkerPool::new(JobKind::Image, Arc::clone(&self.executor))
        })
    }
}

impl RenderStrategy for DedicatedStrategy {
    fn submit_blurhash(&self, payload: BlurhashPayload, sink: Sink) {
        self.blurhash
            .enqueue(Job::new(JobPayload::Blurhash(payload), sink));
    }

    fn submit_image(&self, payload: ImagePayload, sink: Sink) {
        self.image_pool_or_start()
            .enqueue(Job::new(JobPayload::Image(payload), sink));
    }

    fn topology(&self) -> Topology {
        Topology::Dedicated
    }
}

impl std::fmt::Debug for DedicatedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedicatedStrategy")
            .field("blurhash", &self.blurhash)
            .field("image", &self.image.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Dispatch through shared pools.
///
/// Every job opens its own port, posts once, and forwards the single reply
/// to its sink. If the pool goes away first the sink gets
/// [`DecodeError::WorkerLost`].
#[derive(Debug, Clone)]
pub struct SharedStrategy {
    blurhash: SharedPool,
    image: SharedPool,
}

impl SharedStrategy {
    /// Connect to pools that already exist, e.g. ones another renderer
    /// also uses.
    pub fn new(blurhash: SharedPool, image: SharedPool) -> Self {
        Self { blurhash, image }
    }

    /// Start a fresh pair of pools.
    pub fn start(executor: Arc<dyn JobExecutor>) -> Self {
        Self::new(
            SharedPool::start(JobKind::Blurhash, Arc::clone(&executor)),
            SharedPool::start(JobKind::Image, executor),
        )
    }

    /// The shared placeholder pool.
    pub fn blurhash_pool(&self) -> &SharedPool {
        &self.blurhash
    }

    /// The shared image pool.
    pub fn image_pool(&self) -> &SharedPool {
        &self.image
    }

    fn post(pool: &SharedPool, payload: JobPayload, sink: Sink) {
        let (sender, mut inbox) = pool.connect().split();
        if let Err(e) = sender.post_message(payload) {
            tracing::warn!(kind = %pool.kind(), error = %e, "Shared pool refused job");
            sink.complete(Err(DecodeError::WorkerLost));
            return;
        }
        drop(sender);

        tokio::spawn(async move {
            match inbox.recv().await {
                Some(reply) => sink.complete(reply.result),
                None => sink.complete(Err(DecodeError::WorkerLost)),
            }
        });
    }
}

impl RenderStrategy for SharedStrategy {
    fn submit_blurhash(&self, payload: BlurhashPayload, sink: Sink) {
        Self::post(&self.blurhash, JobPayload::Blurhash(payload), sink);
    }

    fn submit_image(&self, payload: ImagePayload, sink: Sink) {
        Self::post(&self.image, JobPayload::Image(payload), sink);
    }

    fn topology(&self) -> Topology {
        Topology::Shared
    }
}
