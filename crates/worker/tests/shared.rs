//! Scheduling behaviour of the actor-backed [`SharedPool`].

mod common;

use std::collections::HashMap;

use assert_matches::assert_matches;
use imagepoly_core::{DecodeError, JobKind};
use imagepoly_worker::{SharedPool, SharedPoolError};

use common::{blurhash, settle, wait_until, within, GatedExecutor};

/// Jobs from several ports share one limit, and every reply goes back to
/// the port that posted it.
#[tokio::test]
async fn limit_is_shared_and_replies_are_routed() {
    let executor = GatedExecutor::new();
    let pool = SharedPool::with_size(JobKind::Blurhash, 2, executor.clone());
    let mut left = pool.connect();
    let mut right = pool.connect();
    assert_eq!(pool.connections(), 2);

    let mut expected_left = HashMap::new();
    let mut expected_right = HashMap::new();
    for i in 0..3 {
        let label = format!("left{i}");
        expected_left.insert(left.post_message(blurhash(&label)).expect("open"), label);
        let label = format!("right{i}");
        expected_right.insert(right.post_message(blurhash(&label)).expect("open"), label);
    }

    wait_until(|| executor.started_count() == 2).await;
    settle().await;
    assert_eq!(executor.started_count(), 2);
    let status = pool.status().await.expect("running");
    assert_eq!((status.busy, status.queued), (2, 4));

    executor.release(6);
    for _ in 0..3 {
        let reply = within(left.recv()).await.expect("reply");
        let label = expected_left.remove(&reply.id).expect("own message");
        assert_eq!(reply.result, Ok(format!("done:{label}")));

        let reply = within(right.recv()).await.expect("reply");
        let label = expected_right.remove(&reply.id).expect("own message");
        assert_eq!(reply.result, Ok(format!("done:{label}")));
    }
    assert!(executor.peak() <= 2);
}

/// A panicking job is reported to its port and the slot is reused.
#[tokio::test]
async fn panic_reaches_port_and_pool_continues() {
    let executor = GatedExecutor::new();
    let pool = SharedPool::with_size(JobKind::Blurhash, 1, executor.clone());
    let mut port = pool.connect();

    let bad = port.post_message(blurhash("panic")).expect("open");
    let good = port.post_message(blurhash("fine")).expect("open");
    executor.release(2);

    let first = within(port.recv()).await.expect("reply");
    assert_eq!(first.id, bad);
    assert_matches!(first.result, Err(DecodeError::Panicked(_)));

    let second = within(port.recv()).await.expect("reply");
    assert_eq!(second.id, good);
    assert_eq!(second.result, Ok("done:fine".into()));
}

/// After shutdown the pool refuses new work.
#[tokio::test]
async fn shutdown_closes_the_pool() {
    let executor = GatedExecutor::new();
    let pool = SharedPool::with_size(JobKind::Image, 1, executor);
    let port = pool.connect();

    pool.shutdown();
    wait_until(|| pool.is_closed()).await;

    assert_eq!(port.post_message(blurhash("late")), Err(SharedPoolError::Closed));
    assert_eq!(pool.status().await, Err(SharedPoolError::Closed));
}
