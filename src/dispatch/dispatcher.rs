//! Dispatcher
//!
//! Owns the submission queue, the worker pool and the send client. `submit`
//! never touches the network: it either enqueues the message and returns a
//! [`ResultHandle`], or fails immediately. `shutdown` stops intake, drains
//! everything already accepted, joins the workers and releases the client.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::handle::{self, ResultHandle};
use crate::dispatch::queue::{QueueItem, Submission, SubmissionQueue};
use crate::dispatch::transform::{JsonMessageTransform, PayloadTransform};
use crate::dispatch::transport::{HttpClient, SendClient};
use crate::dispatch::worker::{WorkerContext, WorkerPool};

/// Default number of delivery workers
pub const DEFAULT_WORKER_COUNT: usize = 10;
/// Default submission queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default per-request timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatcher construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Endpoint receiving every POST
    pub target_url: String,

    /// Number of worker threads
    pub worker_count: usize,

    /// Maximum number of queued submissions
    pub queue_capacity: usize,

    /// Timeout applied to each request
    pub send_timeout: Duration,

    /// Join timeout used when the dispatcher is shut down by scope exit
    pub drain_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            drain_timeout: None,
        }
    }
}

impl DispatcherConfig {
    /// Default configuration for `target_url`
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> DispatchResult<()> {
        if self.target_url.trim().is_empty() {
            return Err(DispatchError::invalid_config("target_url must not be empty"));
        }
        if self.worker_count == 0 {
            return Err(DispatchError::invalid_config("worker_count must be greater than 0"));
        }
        if self.queue_capacity == 0 {
            return Err(DispatchError::invalid_config("queue_capacity must be greater than 0"));
        }
        if self.send_timeout.is_zero() {
            return Err(DispatchError::invalid_config("send_timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// Lifecycle of a dispatcher; only moves from `Open` to `ShutDown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Open,
    ShutDown,
}

/// Summary returned by [`Dispatcher::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers joined so far, across every shutdown call
    pub workers_joined: usize,
    /// Workers still running because the join timeout elapsed
    pub workers_timed_out: usize,
    /// Whether this call released the send client
    pub client_released: bool,
}

impl ShutdownReport {
    /// True when every worker has stopped
    pub fn is_complete(&self) -> bool {
        self.workers_timed_out == 0
    }
}

/// Builder for [`Dispatcher`] with optional collaborators
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    client: Option<Arc<dyn SendClient>>,
    transform: Option<Arc<dyn PayloadTransform>>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            client: None,
            transform: None,
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    pub fn drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.drain_timeout = timeout;
        self
    }

    /// Use an externally supplied send client; it is still closed on shutdown
    pub fn client(mut self, client: Arc<dyn SendClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the default `{"message": ...}` payload transform
    pub fn transform(mut self, transform: Arc<dyn PayloadTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Validate, start the workers and return the running dispatcher
    pub fn build(self) -> DispatchResult<Dispatcher> {
        self.config.validate()?;

        let client: Arc<dyn SendClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpClient::new().map_err(|e| DispatchError::invalid_config(e.to_string()))?),
        };
        let transform = self.transform.unwrap_or_else(|| Arc::new(JsonMessageTransform));

        let queue = SubmissionQueue::new(self.config.queue_capacity);
        let context = Arc::new(WorkerContext {
            target_url: self.config.target_url.clone(),
            send_timeout: self.config.send_timeout,
            client: Arc::clone(&client),
            transform,
        });
        let pool = WorkerPool::spawn(self.config.worker_count, &queue, context)
            .map_err(|e| DispatchError::WorkerSpawn { message: e.to_string() })?;

        info!(
            "Dispatcher ready: {} workers, queue capacity {}, target {}",
            self.config.worker_count, self.config.queue_capacity, self.config.target_url
        );

        Ok(Dispatcher {
            config: self.config,
            queue,
            pool,
            client,
            state: RwLock::new(DispatcherState::Open),
            shutdown_guard: Mutex::new(()),
            client_released: AtomicBool::new(false),
        })
    }

    /// Build a dispatcher, run `f` with it and shut it down afterwards
    ///
    /// Shutdown also happens when `f` panics; the panic keeps unwinding.
    pub fn scope<R>(self, f: impl FnOnce(&Dispatcher) -> R) -> DispatchResult<R> {
        let dispatcher = self.build()?;
        let result = f(&dispatcher);
        dispatcher.shutdown(dispatcher.config.drain_timeout);
        Ok(result)
    }
}

/// Non-blocking notification dispatcher
pub struct Dispatcher {
    config: DispatcherConfig,
    queue: SubmissionQueue,
    pool: WorkerPool,
    client: Arc<dyn SendClient>,
    // Submitters hold the read lock across check-and-enqueue
    state: RwLock<DispatcherState>,
    shutdown_guard: Mutex<()>,
    client_released: AtomicBool,
}

impl Dispatcher {
    /// Start a dispatcher with the default client and transform
    pub fn new(config: DispatcherConfig) -> DispatchResult<Self> {
        DispatcherBuilder::new(config).build()
    }

    /// Builder with default configuration for `target_url`
    pub fn builder(target_url: impl Into<String>) -> DispatcherBuilder {
        DispatcherBuilder::new(DispatcherConfig::new(target_url))
    }

    /// Run `f` with a fresh dispatcher; shuts down on exit, even on panic
    pub fn scope<R>(config: DispatcherConfig, f: impl FnOnce(&Dispatcher) -> R) -> DispatchResult<R> {
        DispatcherBuilder::new(config).scope(f)
    }

    /// Queue `message` for delivery
    ///
    /// Returns immediately. Fails with [`DispatchError::AlreadyShutDown`]
    /// once shutdown has begun, or [`DispatchError::QueueFull`] when the
    /// queue is at capacity; in both cases nothing is enqueued.
    pub fn submit(&self, message: impl Into<String>) -> DispatchResult<ResultHandle> {
        let state = self.state.read();
        if *state == DispatcherState::ShutDown {
            return Err(DispatchError::AlreadyShutDown);
        }

        let (handle, resolver) = handle::channel();
        let submission = Submission {
            message: message.into(),
            resolver,
        };

        match self.queue.try_put(QueueItem::Submission(submission)) {
            Ok(()) => {
                trace!("Accepted submission {}", handle.id());
                Ok(handle)
            }
            Err(e) => {
                warn!("Rejected submission: {}", e);
                Err(e.into())
            }
        }
    }

    /// Stop intake, drain accepted work, join workers, release the client
    ///
    /// Stop signals are enqueued behind every accepted submission, so this
    /// blocks until the queue has room for them. `timeout` bounds the join;
    /// workers still busy afterwards are left running and reported. Calling
    /// again only re-joins workers that had not yet stopped.
    pub fn shutdown(&self, timeout: Option<Duration>) -> ShutdownReport {
        let _serialized = self.shutdown_guard.lock();

        let first_call = {
            let mut state = self.state.write();
            let was_open = *state == DispatcherState::Open;
            *state = DispatcherState::ShutDown;
            was_open
        };

        if first_call {
            info!("Shutting down dispatcher, draining {} queued submissions", self.queue.len());
            for _ in 0..self.pool.size() {
                if self.queue.put(QueueItem::Stop).is_err() {
                    break;
                }
            }
        } else {
            debug!("Dispatcher already shut down, re-checking workers");
        }

        let outcome = self.pool.join(timeout);
        if outcome.timed_out > 0 {
            warn!("Join timeout elapsed with {} workers still running", outcome.timed_out);
        }

        let client_released = !self.client_released.swap(true, Ordering::AcqRel);
        if client_released {
            self.client.close();
            info!("Dispatcher shut down");
        }

        ShutdownReport {
            workers_joined: self.pool.size() - self.pool.remaining(),
            workers_timed_out: outcome.timed_out,
            client_released,
        }
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.read()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state() == DispatcherState::ShutDown
    }

    pub fn target_url(&self) -> &str {
        &self.config.target_url
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn send_timeout(&self) -> Duration {
        self.config.send_timeout
    }

    /// Submissions accepted but not yet picked up by a worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown(self.config.drain_timeout);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}
