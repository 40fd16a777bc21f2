//! Asynchronous Notification Dispatch
//!
//! Callers submit messages that are delivered as HTTP POSTs to a single
//! endpoint without the caller ever blocking on network I/O.
//!
//! # Architecture
//!
//! - **SubmissionQueue**: bounded FIFO of submissions plus stop sentinels
//! - **ResultHandle / Resolver**: single-assignment outcome of one submission
//! - **WorkerPool**: fixed set of threads that transform, send and settle
//! - **Dispatcher**: façade enforcing the shutdown guard and the full-queue
//!   rejection policy
//!
//! # Usage
//!
//! ```no_run
//! use notifee::dispatch::{Dispatcher, DispatcherConfig};
//! use std::time::Duration;
//!
//! let config = DispatcherConfig::new("http://localhost:8080/notify");
//! Dispatcher::scope(config, |dispatcher| {
//!     let handle = dispatcher.submit("deploy finished").unwrap();
//!     match handle.wait(Some(Duration::from_secs(5))) {
//!         Some(Ok(response)) => println!("delivered: HTTP {}", response.status),
//!         Some(Err(e)) => eprintln!("failed: {}", e),
//!         None => eprintln!("still pending"),
//!     }
//! })
//! .unwrap();
//! ```

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod queue;
pub mod transform;
pub mod transport;
pub mod worker;

// Re-export main types for convenience
pub use dispatcher::{
    Dispatcher, DispatcherBuilder, DispatcherConfig, DispatcherState, ShutdownReport,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SEND_TIMEOUT, DEFAULT_WORKER_COUNT,
};
pub use error::{DeliveryError, DeliveryResult, DispatchError, DispatchResult, QueueError};
pub use handle::{ResultHandle, Resolver};
pub use queue::{QueueItem, Submission, SubmissionQueue};
pub use transform::{JsonMessageTransform, PayloadTransform};
pub use transport::{DeliveryResponse, HttpClient, SendClient};
pub use worker::{JoinOutcome, WorkerContext, WorkerPool};

#[cfg(test)]
mod tests;
