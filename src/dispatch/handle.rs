//! Single-Assignment Result Handles
//!
//! Every accepted submission is paired with a [`ResultHandle`] returned to the
//! caller and a [`Resolver`] travelling with the message to a worker. The
//! resolver is consumed by `resolve` or `reject`, so a handle settles exactly
//! once. A resolver dropped without an outcome settles its handle with
//! [`DeliveryError::Abandoned`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::dispatch::error::{DeliveryError, DeliveryResult};
use crate::dispatch::transport::DeliveryResponse;

type Outcome = DeliveryResult<DeliveryResponse>;

struct Shared {
    id: Uuid,
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl Shared {
    fn settle(&self, outcome: Outcome) {
        let mut slot = self.outcome.lock();
        debug_assert!(slot.is_none(), "handle {} settled twice", self.id);
        if slot.is_none() {
            *slot = Some(outcome);
            self.ready.notify_all();
        }
    }
}

/// Create a connected handle/resolver pair
pub(crate) fn channel() -> (ResultHandle, Resolver) {
    let shared = Arc::new(Shared {
        id: Uuid::new_v4(),
        outcome: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        ResultHandle {
            shared: Arc::clone(&shared),
        },
        Resolver {
            shared: Some(shared),
        },
    )
}

/// Observer side of a submission's eventual outcome
///
/// Cloning yields another observer of the same outcome. Observing never
/// changes the state.
#[derive(Clone)]
pub struct ResultHandle {
    shared: Arc<Shared>,
}

impl ResultHandle {
    /// Identifier of the submission this handle belongs to
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Whether the submission has been resolved or rejected
    pub fn is_done(&self) -> bool {
        self.shared.outcome.lock().is_some()
    }

    /// Current outcome without blocking
    pub fn try_result(&self) -> Option<Outcome> {
        self.shared.outcome.lock().clone()
    }

    /// Block until the outcome is known or `timeout` elapses
    ///
    /// `None` means the timeout elapsed while the handle was still pending;
    /// the handle can be waited on again. A `timeout` of `None` waits
    /// indefinitely.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Outcome> {
        // A deadline past what Instant can represent is no deadline at all
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut outcome = self.shared.outcome.lock();
        match deadline {
            None => {
                while outcome.is_none() {
                    self.shared.ready.wait(&mut outcome);
                }
            }
            Some(deadline) => {
                while outcome.is_none() {
                    if self.shared.ready.wait_until(&mut outcome, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        outcome.clone()
    }
}

impl fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("id", &self.shared.id)
            .field("done", &self.is_done())
            .finish()
    }
}

/// Worker side of a submission; settles the paired handle once
pub struct Resolver {
    shared: Option<Arc<Shared>>,
}

impl Resolver {
    /// Identifier of the submission this resolver settles
    pub fn id(&self) -> Uuid {
        match &self.shared {
            Some(shared) => shared.id,
            None => Uuid::nil(),
        }
    }

    /// Fulfil the handle with a successful delivery
    pub fn resolve(self, response: DeliveryResponse) {
        self.complete(Ok(response));
    }

    /// Fulfil the handle with a delivery failure
    pub fn reject(self, error: DeliveryError) {
        self.complete(Err(error));
    }

    fn complete(mut self, outcome: Outcome) {
        if let Some(shared) = self.shared.take() {
            shared.settle(outcome);
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.settle(Err(DeliveryError::Abandoned));
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("id", &self.id()).finish()
    }
}
