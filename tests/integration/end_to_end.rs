//! End-to-End Delivery Tests
//!
//! Runs the dispatcher against a real HTTP endpoint on loopback.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use serde_json::{json, Value};

use common::{EndpointReply, MockEndpoint};
use notifee::dispatch::{DeliveryError, DispatchError, Dispatcher, DispatcherConfig, PayloadTransform};

const WAIT: Option<Duration> = Some(Duration::from_secs(10));

#[test]
fn test_default_configuration_delivers_twenty_messages() {
    let endpoint = MockEndpoint::ok();
    let dispatcher = Dispatcher::new(DispatcherConfig::new(endpoint.url())).unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| dispatcher.submit(format!("msg-{}", i)).unwrap())
        .collect();
    for handle in &handles {
        assert_eq!(handle.wait(WAIT).unwrap().unwrap().status, 200);
    }
    let report = dispatcher.shutdown(Some(Duration::from_secs(10)));
    assert!(report.is_complete());

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 20);
    assert!(requests.iter().all(|r| r.method == "POST" && r.path == "/notify"));
    assert!(requests
        .iter()
        .all(|r| r.content_type.as_deref().is_some_and(|ct| ct.starts_with("application/json"))));

    let mut bodies: Vec<_> = requests.iter().map(|r| r.body["message"].as_str().unwrap().to_string()).collect();
    bodies.sort();
    let mut expected: Vec<_> = (0..20).map(|i| format!("msg-{}", i)).collect();
    expected.sort();
    assert_eq!(bodies, expected);
}

#[test]
fn test_custom_transform_reaches_endpoint() {
    let endpoint = MockEndpoint::ok();
    let transform: Arc<dyn PayloadTransform> = Arc::new(|message: &str| -> Result<Value, DeliveryError> {
        Ok(json!({"event": "notification", "data": {"content": message}, "version": 1}))
    });

    Dispatcher::builder(endpoint.url())
        .workers(2)
        .transform(transform)
        .scope(|dispatcher| {
            dispatcher.submit("alert").unwrap().wait(WAIT).unwrap().unwrap();
        })
        .unwrap();

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        json!({"event": "notification", "data": {"content": "alert"}, "version": 1})
    );
}

#[test]
fn test_single_worker_saturated_queue_rejects_third_message() {
    let (release, gate) = unbounded::<()>();
    let endpoint = MockEndpoint::start(move |index, _| {
        if index == 0 {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        EndpointReply::status(200)
    });

    let dispatcher = Dispatcher::builder(endpoint.url())
        .workers(1)
        .queue_capacity(1)
        .build()
        .unwrap();

    let first = dispatcher.submit("first").unwrap();
    // Wait until the worker is busy with the first request
    let started = std::time::Instant::now();
    while endpoint.request_count() == 0 && started.elapsed() < Duration::from_secs(10) {
        std::thread::sleep(Duration::from_millis(5));
    }
    let second = dispatcher.submit("second").unwrap();

    let error = dispatcher.submit("third").unwrap_err();
    assert_eq!(error, DispatchError::QueueFull { capacity: 1 });
    assert!(error.to_string().contains('1'));

    release.send(()).unwrap();
    assert!(matches!(first.wait(WAIT), Some(Ok(_))));
    assert!(matches!(second.wait(WAIT), Some(Ok(_))));
    dispatcher.shutdown(Some(Duration::from_secs(5)));
    assert_eq!(endpoint.request_count(), 2);
}

#[test]
fn test_shutdown_then_submit_fails_and_handles_are_terminal() {
    let endpoint = MockEndpoint::ok();
    let dispatcher = Dispatcher::builder(endpoint.url()).workers(3).build().unwrap();

    let handles: Vec<_> = (0..30).map(|i| dispatcher.submit(format!("n{}", i)).unwrap()).collect();
    dispatcher.shutdown(None);

    assert!(handles.iter().all(|h| h.is_done()));
    assert!(matches!(dispatcher.submit("late"), Err(DispatchError::AlreadyShutDown)));
    assert_eq!(endpoint.request_count(), 30);
}
