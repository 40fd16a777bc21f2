//! Worker Pool
//!
//! A fixed set of OS threads draining the submission queue. Each worker takes
//! one item at a time, builds the payload, performs the send and settles the
//! submission's handle. A failed delivery only affects its own handle; the
//! worker goes straight back to the queue. A stop sentinel ends exactly one
//! worker.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::dispatch::error::{DeliveryError, DeliveryResult};
use crate::dispatch::queue::{QueueItem, Submission, SubmissionQueue};
use crate::dispatch::transform::PayloadTransform;
use crate::dispatch::transport::{DeliveryResponse, SendClient};

/// Everything a worker needs to deliver a submission; shared read-only
pub struct WorkerContext {
    pub target_url: String,
    pub send_timeout: Duration,
    pub client: Arc<dyn SendClient>,
    pub transform: Arc<dyn PayloadTransform>,
}

impl WorkerContext {
    fn deliver(&self, message: &str) -> DeliveryResult<DeliveryResponse> {
        let payload = self.transform.transform(message)?;
        self.client.post_json(&self.target_url, &payload, self.send_timeout)
    }
}

/// Result of joining the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Workers that finished during this join
    pub joined: usize,
    /// Workers still running when the timeout elapsed
    pub timed_out: usize,
}

struct Worker {
    name: String,
    thread: Option<JoinHandle<()>>,
    // Disconnects when the worker thread ends, however it ends
    exited: Receiver<()>,
}

/// Fixed-size pool of delivery workers
pub struct WorkerPool {
    workers: Mutex<Vec<Worker>>,
    size: usize,
}

impl WorkerPool {
    /// Start `count` workers pulling from `queue`
    pub fn spawn(count: usize, queue: &SubmissionQueue, context: Arc<WorkerContext>) -> io::Result<Self> {
        let mut workers = Vec::with_capacity(count);

        for index in 0..count {
            let name = format!("notifee-worker-{}", index);
            let (exit_signal, exited) = bounded::<()>(0);
            let worker_queue = queue.clone();
            let worker_context = Arc::clone(&context);
            let worker_name = name.clone();

            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _exit_signal = exit_signal;
                run_worker(&worker_name, &worker_queue, &worker_context);
            });

            match spawned {
                Ok(thread) => workers.push(Worker {
                    name,
                    thread: Some(thread),
                    exited,
                }),
                Err(e) => {
                    error!("Failed to spawn {}: {}", name, e);
                    for _ in &workers {
                        let _ = queue.put(QueueItem::Stop);
                    }
                    for worker in workers {
                        if let Some(thread) = worker.thread {
                            let _ = thread.join();
                        }
                    }
                    return Err(e);
                }
            }
        }

        debug!("Started {} delivery workers", count);
        Ok(Self {
            workers: Mutex::new(workers),
            size: count,
        })
    }

    /// Number of workers the pool was started with
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not yet joined
    pub fn remaining(&self) -> usize {
        self.workers.lock().len()
    }

    /// Join every remaining worker, waiting at most `timeout` overall
    ///
    /// Workers that do not finish in time are left running and stay tracked,
    /// so a later call can join them. A timeout too large to express as a
    /// deadline waits indefinitely.
    pub fn join(&self, timeout: Option<Duration>) -> JoinOutcome {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut workers = self.workers.lock();
        let mut joined = 0;

        workers.retain_mut(|worker| {
            let finished = match deadline {
                None => {
                    let _ = worker.exited.recv();
                    true
                }
                Some(deadline) => !matches!(
                    worker.exited.recv_deadline(deadline),
                    Err(RecvTimeoutError::Timeout)
                ),
            };

            if !finished {
                warn!("{} did not stop before the join timeout", worker.name);
                return true;
            }

            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("{} terminated by panic", worker.name);
                }
            }
            joined += 1;
            false
        });

        JoinOutcome {
            joined,
            timed_out: workers.len(),
        }
    }
}

fn run_worker(name: &str, queue: &SubmissionQueue, context: &WorkerContext) {
    debug!("{} started", name);

    while let Some(item) = queue.take() {
        match item {
            QueueItem::Stop => break,
            QueueItem::Submission(submission) => process(name, context, submission),
        }
    }

    debug!("{} stopped", name);
}

fn process(name: &str, context: &WorkerContext, submission: Submission) {
    let Submission { message, resolver } = submission;
    let id = resolver.id();
    trace!("{} delivering {}", name, id);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| context.deliver(&message)))
        .unwrap_or_else(|_| {
            error!("{} recovered from a panic while delivering {}", name, id);
            Err(DeliveryError::Abandoned)
        });

    match outcome {
        Ok(response) => {
            debug!("Delivered {} (HTTP {}, {}ms)", id, response.status, response.duration.as_millis());
            resolver.resolve(response);
        }
        Err(e) => {
            warn!("Delivery of {} failed: {}", id, e);
            resolver.reject(e);
        }
    }
}
