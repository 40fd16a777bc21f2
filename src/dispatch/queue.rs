//! Bounded Submission Queue
//!
//! Fixed-capacity FIFO channel shared by the dispatcher (producer) and every
//! worker (consumers). Carries submissions plus a stop sentinel.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::dispatch::error::QueueError;
use crate::dispatch::handle::Resolver;

/// One accepted message with the resolver for its handle
#[derive(Debug)]
pub struct Submission {
    pub message: String,
    pub resolver: Resolver,
}

/// Item carried by the queue
#[derive(Debug)]
pub enum QueueItem {
    /// Real work
    Submission(Submission),
    /// Terminates exactly one worker
    Stop,
}

/// Fixed-capacity multi-producer multi-consumer queue
#[derive(Debug, Clone)]
pub struct SubmissionQueue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    capacity: usize,
}

impl SubmissionQueue {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Enqueue, blocking while the queue is full
    pub fn put(&self, item: QueueItem) -> Result<(), QueueError> {
        self.sender.send(item).map_err(|_| QueueError::Disconnected)
    }

    /// Enqueue without blocking
    ///
    /// On failure the item is dropped; a dropped submission abandons its
    /// handle.
    pub fn try_put(&self, item: QueueItem) -> Result<(), QueueError> {
        self.sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full {
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => QueueError::Disconnected,
        })
    }

    /// Dequeue, blocking until an item arrives
    ///
    /// Returns `None` only when every sender has been dropped and the queue
    /// is drained.
    pub fn take(&self) -> Option<QueueItem> {
        self.receiver.recv().ok()
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
