//! Error Recovery Tests
//!
//! Delivery failures must stay local to their own result handle.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{EndpointReply, MockEndpoint};
use notifee::dispatch::{DeliveryError, Dispatcher};

const WAIT: Option<Duration> = Some(Duration::from_secs(10));

#[test]
fn test_non_success_status_rejects_only_that_submission() {
    let endpoint = MockEndpoint::start(|index, _| {
        if index == 0 {
            EndpointReply::status(500)
        } else {
            EndpointReply::status(201)
        }
    });
    let dispatcher = Dispatcher::builder(endpoint.url()).workers(1).build().unwrap();

    let failing = dispatcher.submit("bad").unwrap();
    let succeeding = dispatcher.submit("good").unwrap();

    match failing.wait(WAIT) {
        Some(Err(DeliveryError::Status { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "ok");
        }
        other => panic!("expected a status failure, got {:?}", other),
    }
    assert_eq!(succeeding.wait(WAIT).unwrap().unwrap().status, 201);
}

#[test]
fn test_client_errors_are_failures_too() {
    let endpoint = MockEndpoint::start(|_, _| EndpointReply::status(404));
    let dispatcher = Dispatcher::builder(endpoint.url()).workers(2).build().unwrap();

    let handle = dispatcher.submit("missing").unwrap();
    let error = handle.wait(WAIT).unwrap().unwrap_err();
    assert_eq!(error.status_code(), Some(404));
}

#[test]
fn test_slow_endpoint_times_out() {
    let endpoint = MockEndpoint::start(|index, _| {
        if index == 0 {
            EndpointReply::delayed(200, Duration::from_secs(2))
        } else {
            EndpointReply::status(200)
        }
    });
    let dispatcher = Dispatcher::builder(endpoint.url())
        .workers(1)
        .send_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let slow = dispatcher.submit("slow").unwrap();
    let fast = dispatcher.submit("fast").unwrap();

    assert_eq!(slow.wait(WAIT), Some(Err(DeliveryError::Timeout { timeout_ms: 200 })));
    assert!(matches!(fast.wait(WAIT), Some(Ok(_))));
}

#[test]
fn test_unreachable_endpoint_is_network_error() {
    // Bind and immediately release a port so nothing is listening on it
    let address = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let dispatcher = Dispatcher::builder(format!("http://{}/notify", address))
        .workers(1)
        .send_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let handle = dispatcher.submit("nobody home").unwrap();
    assert!(matches!(handle.wait(WAIT), Some(Err(DeliveryError::Network { .. }))));

    let report = dispatcher.shutdown(Some(Duration::from_secs(5)));
    assert!(report.is_complete());
    assert!(report.client_released);
}
