//! # Verifier Registry
//!
//! Tracks which verifiers are attached to the request queue, using only the
//! bus's membership events. Job traffic plays no part: an idle verifier
//! still counts.
//!
//! ## Consistency
//!
//! The registry subscribes before taking its initial snapshot, so no
//! attachment can slip between the two. Membership is a set, so an event
//! that repeats what the snapshot already shows is harmless. If the
//! subscription lags, the registry rebuilds the set from a fresh snapshot.

use crate::errors::RequestorError;
use parking_lot::RwLock;
use shared_bus::{ConsumerId, MembershipEvent, MembershipFilter, MessageBus, SubscriptionError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Live view of the verifiers attached to one queue.
pub struct VerifierRegistry {
    queue: String,
    members: Arc<RwLock<BTreeSet<ConsumerId>>>,
    count: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl VerifierRegistry {
    /// Start tracking consumers of `queue` on `bus`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<B: MessageBus>(bus: &Arc<B>, queue: &str) -> Self {
        let mut subscription = bus.subscribe_membership(MembershipFilter::queue(queue));
        let members: BTreeSet<ConsumerId> = bus.consumers(queue).into_iter().collect();
        let (count_tx, count) = watch::channel(members.len());
        let members = Arc::new(RwLock::new(members));

        let task = {
            let bus = bus.clone();
            let queue = queue.to_string();
            let members = members.clone();
            tokio::spawn(async move {
                loop {
                    match subscription.recv().await {
                        Ok(MembershipEvent::ConsumerAttached { consumer, .. }) => {
                            if members.write().insert(consumer) {
                                info!(queue = %queue, consumer = %consumer, "Verifier attached");
                            }
                        }
                        Ok(MembershipEvent::ConsumerDetached { consumer, .. }) => {
                            if members.write().remove(&consumer) {
                                info!(queue = %queue, consumer = %consumer, "Verifier detached");
                            }
                        }
                        Err(SubscriptionError::Lagged(missed)) => {
                            warn!(queue = %queue, missed = missed, "Membership events missed, resynchronizing");
                            *members.write() = bus.consumers(&queue).into_iter().collect();
                        }
                        Err(SubscriptionError::Closed) => {
                            debug!(queue = %queue, "Membership subscription closed");
                            break;
                        }
                    }
                    let current = members.read().len();
                    count_tx.send_if_modified(|count| {
                        let changed = *count != current;
                        *count = current;
                        changed
                    });
                }
            })
        };

        Self {
            queue: queue.to_string(),
            members,
            count,
            task,
        }
    }

    /// Queue being tracked.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Number of verifiers currently attached.
    pub fn verifier_count(&self) -> usize {
        *self.count.borrow()
    }

    /// Identities of the verifiers currently attached.
    pub fn verifiers(&self) -> Vec<ConsumerId> {
        self.members.read().iter().copied().collect()
    }

    /// Wait until at least `required` verifiers are attached.
    ///
    /// Returns immediately if enough already are.
    ///
    /// # Errors
    ///
    /// * `RequestorError::VerifierTimeout` - Not enough verifiers within `timeout`
    /// * `RequestorError::Closed` - The registry stopped tracking membership
    pub async fn wait_until_number_of_verifiers(
        &self,
        required: usize,
        timeout: Duration,
    ) -> Result<(), RequestorError> {
        let mut count = self.count.clone();
        let waited = tokio::time::timeout(timeout, count.wait_for(|n| *n >= required))
            .await
            .map(|reached| reached.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RequestorError::Closed),
            Err(_) => {
                let attached = self.verifier_count();
                warn!(
                    queue = %self.queue,
                    required = required,
                    attached = attached,
                    "Timed out waiting for verifiers"
                );
                Err(RequestorError::VerifierTimeout {
                    required,
                    attached,
                    waited: timeout,
                })
            }
        }
    }
}

impl Drop for VerifierRegistry {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("queue", &self.queue)
            .field("verifiers", &self.verifier_count())
            .finish()
    }
}
