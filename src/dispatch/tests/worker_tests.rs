//! Worker pool tests

use std::sync::Arc;
use std::time::Duration;

use super::mock_client::{MockClient, MockReply};
use crate::dispatch::handle;
use crate::dispatch::{
    DeliveryError, JsonMessageTransform, QueueItem, SendClient, Submission, SubmissionQueue,
    WorkerContext, WorkerPool,
};

fn context(client: Arc<dyn SendClient>) -> Arc<WorkerContext> {
    Arc::new(WorkerContext {
        target_url: "http://localhost:8080/hook".to_string(),
        send_timeout: Duration::from_secs(3),
        client,
        transform: Arc::new(JsonMessageTransform),
    })
}

fn submit(queue: &SubmissionQueue, message: &str) -> crate::dispatch::ResultHandle {
    let (handle, resolver) = handle::channel();
    queue
        .put(QueueItem::Submission(Submission {
            message: message.to_string(),
            resolver,
        }))
        .unwrap();
    handle
}

#[test]
fn test_pool_processes_submissions() {
    let client = MockClient::responding(202);
    let queue = SubmissionQueue::new(16);
    let pool = WorkerPool::spawn(3, &queue, context(client.clone())).unwrap();
    assert_eq!(pool.size(), 3);

    let handles: Vec<_> = (0..6).map(|i| submit(&queue, &format!("m{}", i))).collect();
    for handle in &handles {
        assert_eq!(handle.wait(Some(Duration::from_secs(5))).unwrap().unwrap().status, 202);
    }

    for _ in 0..3 {
        queue.put(QueueItem::Stop).unwrap();
    }
    let outcome = pool.join(Some(Duration::from_secs(5)));
    assert_eq!(outcome.joined, 3);
    assert_eq!(outcome.timed_out, 0);
    assert_eq!(pool.remaining(), 0);

    let calls = client.calls();
    assert_eq!(calls.len(), 6);
    assert!(calls.iter().all(|c| c.url == "http://localhost:8080/hook"));
    assert!(calls.iter().all(|c| c.timeout == Duration::from_secs(3)));
}

#[test]
fn test_stop_signal_ends_exactly_one_worker() {
    let client = MockClient::responding(200);
    let queue = SubmissionQueue::new(8);
    let pool = WorkerPool::spawn(2, &queue, context(client)).unwrap();

    queue.put(QueueItem::Stop).unwrap();
    let outcome = pool.join(Some(Duration::from_millis(200)));
    assert_eq!(outcome.joined, 1);
    assert_eq!(outcome.timed_out, 1);

    // The surviving worker still delivers
    let handle = submit(&queue, "still served");
    assert!(matches!(handle.wait(Some(Duration::from_secs(5))), Some(Ok(_))));

    queue.put(QueueItem::Stop).unwrap();
    let outcome = pool.join(None);
    assert_eq!(outcome.joined, 1);
    assert_eq!(pool.remaining(), 0);
}

#[test]
fn test_failures_stay_local_to_their_submission() {
    let client = MockClient::scripted(vec![
        MockReply::Fail(DeliveryError::network("reset")),
        MockReply::Status(404),
        MockReply::Status(200),
    ]);
    let queue = SubmissionQueue::new(8);
    let pool = WorkerPool::spawn(1, &queue, context(client)).unwrap();

    let reset = submit(&queue, "one");
    let missing = submit(&queue, "two");
    let delivered = submit(&queue, "three");

    let wait = Some(Duration::from_secs(5));
    assert_eq!(reset.wait(wait), Some(Err(DeliveryError::network("reset"))));
    assert!(matches!(missing.wait(wait), Some(Err(DeliveryError::Status { status: 404, .. }))));
    assert!(matches!(delivered.wait(wait), Some(Ok(_))));

    queue.put(QueueItem::Stop).unwrap();
    assert_eq!(pool.join(None).joined, 1);
}

#[test]
fn test_stop_signal_never_reaches_client() {
    let client = MockClient::responding(200);
    let queue = SubmissionQueue::new(4);
    let pool = WorkerPool::spawn(2, &queue, context(client.clone())).unwrap();

    queue.put(QueueItem::Stop).unwrap();
    queue.put(QueueItem::Stop).unwrap();
    assert_eq!(pool.join(None).joined, 2);
    assert_eq!(client.call_count(), 0);
}
