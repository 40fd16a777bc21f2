//! Shared test utilities: a local HTTP endpoint recording every request

#![allow(dead_code)]

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tiny_http::{Response, Server};

/// How the endpoint answers one request
#[derive(Debug, Clone, Copy)]
pub struct EndpointReply {
    pub status: u16,
    pub delay: Duration,
}

impl EndpointReply {
    pub fn status(status: u16) -> Self {
        Self { status, delay: Duration::ZERO }
    }

    pub fn delayed(status: u16, delay: Duration) -> Self {
        Self { status, delay }
    }
}

/// One request observed by the endpoint
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Value,
}

type Responder = dyn Fn(usize, &Value) -> EndpointReply + Send + Sync;

/// HTTP endpoint on an ephemeral loopback port
pub struct MockEndpoint {
    server: Arc<Server>,
    url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    acceptor: Option<JoinHandle<()>>,
}

impl MockEndpoint {
    /// Endpoint answering every request with 200
    pub fn ok() -> Self {
        Self::start(|_, _| EndpointReply::status(200))
    }

    /// Endpoint answering request number `index` (0-based) via `responder`
    pub fn start(responder: impl Fn(usize, &Value) -> EndpointReply + Send + Sync + 'static) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test endpoint"));
        let address = server.server_addr().to_ip().expect("test endpoint has no IP address");
        let url = format!("http://{}/notify", address);
        let received = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let acceptor = {
            let server = Arc::clone(&server);
            let received = Arc::clone(&received);
            thread::spawn(move || {
                let mut handlers = Vec::new();
                for (index, mut request) in server.incoming_requests().enumerate() {
                    let mut raw = String::new();
                    let _ = request.as_reader().read_to_string(&mut raw);
                    let body = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                    let content_type = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Content-Type"))
                        .map(|h| h.value.as_str().to_string());

                    received.lock().push(ReceivedRequest {
                        method: request.method().to_string(),
                        path: request.url().to_string(),
                        content_type,
                        body: body.clone(),
                    });

                    let responder = Arc::clone(&responder);
                    handlers.push(thread::spawn(move || {
                        let reply = responder(index, &body);
                        if !reply.delay.is_zero() {
                            thread::sleep(reply.delay);
                        }
                        let response = Response::from_string("ok").with_status_code(reply.status);
                        let _ = request.respond(response);
                    }));
                }
                for handler in handlers {
                    let _ = handler.join();
                }
            })
        };

        Self {
            server,
            url,
            received,
            acceptor: Some(acceptor),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.received.lock().len()
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
    }
}
