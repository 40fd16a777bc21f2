//! Dispatch Error Types
//!
//! Errors raised synchronously to submitters, errors carried by result
//! handles, and errors produced by the submission queue itself.

use thiserror::Error;

/// Result type for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for a single delivery
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors surfaced directly to the caller of `submit` or the builder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Submission attempted after shutdown began
    #[error("Dispatcher is shut down")]
    AlreadyShutDown,

    /// Submission queue is at capacity
    #[error("Queue is full (max size: {capacity})")]
    QueueFull { capacity: usize },

    /// Construction parameters were rejected
    #[error("Invalid dispatcher configuration: {message}")]
    InvalidConfig { message: String },

    /// A worker thread could not be started
    #[error("Failed to start delivery workers: {message}")]
    WorkerSpawn { message: String },
}

impl DispatchError {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Failure of one submission, observable only through its result handle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The payload transform rejected the message
    #[error("Failed to build payload: {message}")]
    Transform { message: String },

    /// Transport-level failure (connect, DNS, TLS, broken connection)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request did not complete within the send timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The endpoint answered with a non-2xx status
    #[error("Endpoint returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The send client was released before the request was issued
    #[error("Send client has been closed")]
    ClientClosed,

    /// The submission was dropped without an outcome
    #[error("Submission was abandoned before delivery completed")]
    Abandoned,
}

impl DeliveryError {
    /// Create a transform error
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error from the configured send timeout
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status carried by the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors produced by the bounded submission queue
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue has reached its capacity limit
    #[error("Queue is full (max size: {capacity})")]
    Full { capacity: usize },

    /// Every receiving worker is gone
    #[error("Queue has no remaining consumers")]
    Disconnected,
}

impl From<QueueError> for DispatchError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Full { capacity } => DispatchError::QueueFull { capacity },
            QueueError::Disconnected => DispatchError::AlreadyShutDown,
        }
    }
}
