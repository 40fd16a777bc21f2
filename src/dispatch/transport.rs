//! Send Clients
//!
//! The dispatcher performs one HTTP POST per submission through a
//! [`SendClient`]. [`HttpClient`] is the production implementation backed by a
//! pooled `reqwest` blocking client; tests and embedders can supply their own.

use std::time::{Duration, Instant};

use log::trace;
use parking_lot::RwLock;
use serde_json::Value;

use crate::dispatch::error::{DeliveryError, DeliveryResult};

/// Maximum number of response body bytes kept on a delivery result
const MAX_BODY_BYTES: usize = 4096;

/// Outcome of a successful (2xx) delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, truncated to a bounded size
    pub body: String,
    /// Time spent on the request
    pub duration: Duration,
}

impl DeliveryResponse {
    pub fn new(status: u16, body: impl Into<String>, duration: Duration) -> Self {
        Self {
            status,
            body: body.into(),
            duration,
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to POST a JSON body to a URL
///
/// Implementations are shared by every worker and must tolerate concurrent
/// calls. A non-2xx status must be reported as [`DeliveryError::Status`].
pub trait SendClient: Send + Sync {
    /// Send `body` as JSON to `url`, failing after `timeout`
    fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> DeliveryResult<DeliveryResponse>;

    /// Release pooled resources; called once after all workers stop
    fn close(&self);
}

/// Pooled blocking HTTP client
pub struct HttpClient {
    inner: RwLock<Option<reqwest::blocking::Client>>,
}

impl HttpClient {
    /// Build a client with the crate's user agent
    pub fn new() -> DeliveryResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("notifee/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::from_client(client))
    }

    /// Wrap an externally configured `reqwest` client
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self {
            inner: RwLock::new(Some(client)),
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> DeliveryError {
        if error.is_timeout() {
            DeliveryError::timeout(timeout)
        } else if error.is_connect() {
            DeliveryError::network(format!("connection failed: {}", error))
        } else {
            DeliveryError::network(error.to_string())
        }
    }
}

impl SendClient for HttpClient {
    fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> DeliveryResult<DeliveryResponse> {
        // Clone the handle out so the lock is not held across network I/O
        let client = match self.inner.read().as_ref() {
            Some(client) => client.clone(),
            None => return Err(DeliveryError::ClientClosed),
        };

        let started = Instant::now();
        let response = client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status().as_u16();
        let mut text = response.text().map_err(|e| Self::classify(e, timeout))?;
        if text.len() > MAX_BODY_BYTES {
            let mut cut = MAX_BODY_BYTES;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        let duration = started.elapsed();
        trace!("POST {} -> {} in {}ms", url, status, duration.as_millis());

        let response = DeliveryResponse::new(status, text, duration);
        if response.is_success() {
            Ok(response)
        } else {
            Err(DeliveryError::status(status, response.body))
        }
    }

    fn close(&self) {
        self.inner.write().take();
    }
}
