//! Scheduling behaviour of the dedicated [`WorkerPool`].

mod common;

use assert_matches::assert_matches;
use imagepoly_core::{sink, Job, JobKind, RenderState, SinkReader};
use imagepoly_worker::{PoolEvent, PoolStatus, WorkerPool};

use common::{blurhash, settle, wait_until, within, GatedExecutor};

fn submit(pool: &WorkerPool, label: &str) -> SinkReader {
    let (sink, reader) = sink::channel();
    pool.enqueue(Job::new(blurhash(label), sink));
    reader
}

// ---------------------------------------------------------------------------
// Concurrency limit
// ---------------------------------------------------------------------------

/// More jobs than slots never run more than `size` at once.
#[tokio::test]
async fn never_exceeds_pool_size() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Blurhash, 2, executor.clone());

    let mut readers: Vec<_> = (0..6).map(|i| submit(&pool, &format!("job{i}"))).collect();

    wait_until(|| executor.started_count() == 2).await;
    settle().await;
    assert_eq!(executor.started_count(), 2);
    assert_eq!(
        pool.status(),
        PoolStatus {
            size: 2,
            ready: 0,
            busy: 2,
            queued: 4,
        }
    );

    executor.release(6);
    for reader in &mut readers {
        assert_matches!(within(reader.settled()).await, RenderState::Ready(_));
    }
    assert!(executor.peak() <= 2);
    wait_until(|| pool.status().is_idle()).await;
}

/// Three placeholders against two slots: two start at once, the third only
/// after one of them posts its result.
#[tokio::test]
async fn third_job_waits_for_a_free_slot() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Blurhash, 2, executor.clone());
    let hash = "L6PZfSi:.AyE_3t7t7R**0o#DgR4";

    let mut readers: Vec<_> = (0..3).map(|_| submit(&pool, hash)).collect();

    wait_until(|| executor.started_count() == 2).await;
    settle().await;
    assert_eq!(executor.started_count(), 2);
    assert!(readers.iter().all(|r| r.current().is_pending()));

    executor.release(1);
    wait_until(|| executor.started_count() == 3).await;
    let settled = readers.iter().filter(|r| !r.current().is_pending()).count();
    assert_eq!(settled, 1);

    executor.release(2);
    for reader in &mut readers {
        assert_eq!(
            within(reader.settled()).await,
            RenderState::Ready(format!("done:{hash}"))
        );
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// A failing or panicking job frees its slot and the queue keeps moving.
#[tokio::test]
async fn slot_recovers_after_error_and_panic() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Blurhash, 1, executor.clone());

    let mut panicked = submit(&pool, "panic");
    let mut failed = submit(&pool, "fail");
    let mut ok = submit(&pool, "ok");
    executor.release(3);

    assert_matches!(
        within(panicked.settled()).await,
        RenderState::Failed { reason } if reason.contains("executor blew up")
    );
    assert_matches!(within(failed.settled()).await, RenderState::Failed { .. });
    assert_eq!(within(ok.settled()).await, RenderState::Ready("done:ok".into()));

    wait_until(|| pool.status().ready == 1).await;
}

// ---------------------------------------------------------------------------
// Ordering and events
// ---------------------------------------------------------------------------

/// Within one kind, jobs start in the order they were queued.
#[tokio::test]
async fn dispatch_is_fifo() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Blurhash, 1, executor.clone());

    let mut readers: Vec<_> = ["a", "b", "c", "d"].iter().map(|l| submit(&pool, l)).collect();
    executor.release(4);
    for reader in &mut readers {
        within(reader.settled()).await;
    }

    assert_eq!(executor.started(), vec!["a", "b", "c", "d"]);
}

/// Each job produces a dispatch event followed by a completion event.
#[tokio::test]
async fn emits_dispatch_and_completion() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Blurhash, 1, executor.clone());
    let mut events = pool.subscribe();

    let mut reader = submit(&pool, "fail");
    executor.release(1);
    within(reader.settled()).await;

    assert_matches!(
        within(events.recv()).await,
        Ok(PoolEvent::Dispatched { kind: JobKind::Blurhash, slot: 0, .. })
    );
    assert_matches!(
        within(events.recv()).await,
        Ok(PoolEvent::Completed { ok: false, slot: 0, .. })
    );
}

/// Clones share slots and queue.
#[tokio::test]
async fn clones_share_state() {
    let executor = GatedExecutor::new();
    let pool = WorkerPool::with_size(JobKind::Image, 1, executor.clone());
    let other = pool.clone();

    let _a = submit(&pool, "a");
    let _b = submit(&other, "b");
    wait_until(|| executor.started_count() == 1).await;

    assert_eq!(other.status().queued, 1);
    executor.release(2);
    wait_until(|| pool.status().is_idle()).await;
}
