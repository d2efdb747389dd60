//! Gated executor shared by the pool integration tests.
//!
//! Every job records its label on start, then parks on a semaphore until
//! the test releases it. Labels `"panic"` and `"fail"` panic or error after
//! release; anything else succeeds with `done:<label>`.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use imagepoly_core::{BlurhashPayload, DecodeError, JobExecutor, JobPayload};
use tokio::sync::Semaphore;

pub struct GatedExecutor {
    gate: Semaphore,
    running: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl GatedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    /// Let `n` parked (or future) jobs finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().expect("lock").clone()
    }

    pub fn started_count(&self) -> usize {
        self.started.lock().expect("lock").len()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for GatedExecutor {
    async fn execute(&self, payload: JobPayload) -> Result<String, DecodeError> {
        let label = match payload {
            JobPayload::Blurhash(p) => p.hash,
            JobPayload::Image(p) => p.source,
        };

        self.started.lock().expect("lock").push(label.clone());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        self.gate.acquire().await.expect("gate open").forget();
        self.running.fetch_sub(1, Ordering::SeqCst);

        match label.as_str() {
            "panic" => panic!("executor blew up"),
            "fail" => Err(DecodeError::InvalidBlurhash(label)),
            _ => Ok(format!("done:{label}")),
        }
    }
}

pub fn blurhash(label: &str) -> JobPayload {
    JobPayload::Blurhash(BlurhashPayload::new(label, 32, 32))
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Await `fut` with the same five second ceiling.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

/// Give the runtime a moment to do anything it was going to do.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
