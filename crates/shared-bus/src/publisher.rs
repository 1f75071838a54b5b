//! # Message Bus
//!
//! Defines the sending side of the bus and the in-memory reference bus.
//!
//! ## Guarantees
//!
//! - **At-least-once**: a message stays on its queue until acknowledged.
//! - **Single consumer at a time**: an outstanding message is held by exactly
//!   one consumer until it is acknowledged, nacked, or that consumer detaches.
//! - **No consumer required**: `send` never waits for a consumer to exist.

use crate::errors::BusError;
use crate::events::{ConsumerId, MembershipEvent, MembershipFilter};
use crate::subscriber::{InMemoryConsumer, MembershipSubscription, QueueConsumer};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::BusMessage;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, futures::Notified, Notify};
use tracing::{debug, info, warn};

/// A durable point-to-point queue service with competing consumers.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Consumer handle produced by [`MessageBus::attach`].
    type Consumer: QueueConsumer;

    /// Enqueue a message. Succeeds once the message is stored, whether or not
    /// any consumer is attached.
    async fn send(&self, queue: &str, message: BusMessage) -> Result<(), BusError>;

    /// Attach a new competing consumer to `queue`.
    fn attach(&self, queue: &str) -> Result<Self::Consumer, BusError>;

    /// Subscribe to consumer attach/detach events.
    fn subscribe_membership(&self, filter: MembershipFilter) -> MembershipSubscription;

    /// Snapshot of the consumers currently attached to `queue`.
    fn consumers(&self, queue: &str) -> Vec<ConsumerId>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// Counters kept by the in-memory bus.
#[derive(Debug, Default)]
pub struct BusStats {
    sent: AtomicU64,
    delivered: AtomicU64,
    acked: AtomicU64,
    redelivered: AtomicU64,
}

impl BusStats {
    /// Messages accepted by `send`.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Messages handed to a consumer (redeliveries included).
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages acknowledged and removed.
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    /// Messages handed back to a queue after a nack, drop, or detach.
    pub fn redelivered(&self) -> u64 {
        self.redelivered.load(Ordering::Relaxed)
    }
}

/// A stored message and how often it has been handed out.
#[derive(Debug, Clone)]
pub(crate) struct QueuedMessage {
    pub(crate) message: BusMessage,
    pub(crate) delivery_count: u32,
}

#[derive(Debug)]
struct InFlight {
    consumer: ConsumerId,
    queued: QueuedMessage,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<QueuedMessage>,
    in_flight: HashMap<u64, InFlight>,
    consumers: BTreeSet<ConsumerId>,
}

#[derive(Debug, Default)]
struct BusState {
    queues: HashMap<String, QueueState>,
    closed: bool,
}

/// How a delivery is being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    Ack,
    Nack,
}

/// Shared state behind the in-memory bus and its consumer handles.
pub(crate) struct BusInner {
    state: Mutex<BusState>,
    /// Woken on every send, requeue, and close.
    available: Notify,
    membership: broadcast::Sender<MembershipEvent>,
    next_tag: AtomicU64,
    next_consumer: AtomicU64,
    stats: BusStats,
}

impl BusInner {
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.available.notified()
    }

    /// Take the next ready message for `consumer`, marking it outstanding.
    pub(crate) fn try_take(
        &self,
        queue: &str,
        consumer: ConsumerId,
    ) -> Result<Option<(u64, QueuedMessage)>, BusError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BusError::Closed);
        }
        let Some(q) = state.queues.get_mut(queue) else {
            return Ok(None);
        };
        let Some(mut queued) = q.ready.pop_front() else {
            return Ok(None);
        };

        queued.delivery_count += 1;
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        q.in_flight.insert(
            tag,
            InFlight {
                consumer,
                queued: queued.clone(),
            },
        );
        self.stats.delivered.fetch_add(1, Ordering::Relaxed);

        debug!(
            queue = queue,
            consumer = %consumer,
            tag = tag,
            correlation_id = %queued.message.correlation_id,
            delivery_count = queued.delivery_count,
            "Message delivered"
        );
        Ok(Some((tag, queued)))
    }

    /// Ack removes an outstanding message; nack puts it back at the head.
    pub(crate) fn settle(
        &self,
        queue: &str,
        tag: u64,
        settlement: Settlement,
    ) -> Result<(), BusError> {
        let mut state = self.state.lock();
        let unknown = || BusError::UnknownDelivery {
            queue: queue.to_string(),
            tag,
        };
        let q = state.queues.get_mut(queue).ok_or_else(unknown)?;
        let in_flight = q.in_flight.remove(&tag).ok_or_else(unknown)?;

        match settlement {
            Settlement::Ack => {
                self.stats.acked.fetch_add(1, Ordering::Relaxed);
            }
            Settlement::Nack => {
                q.ready.push_front(in_flight.queued);
                self.stats.redelivered.fetch_add(1, Ordering::Relaxed);
                drop(state);
                self.available.notify_waiters();
            }
        }
        Ok(())
    }

    /// Remove a consumer and hand back everything it left outstanding.
    pub(crate) fn detach(&self, queue: &str, consumer: ConsumerId) {
        let requeued = {
            let mut state = self.state.lock();
            let Some(q) = state.queues.get_mut(queue) else {
                return;
            };
            q.consumers.remove(&consumer);

            let mut tags: Vec<u64> = q
                .in_flight
                .iter()
                .filter(|(_, f)| f.consumer == consumer)
                .map(|(tag, _)| *tag)
                .collect();
            // Oldest first, so push_front leaves them in original order.
            tags.sort_unstable();
            for tag in tags.iter().rev() {
                if let Some(f) = q.in_flight.remove(tag) {
                    q.ready.push_front(f.queued);
                }
            }
            tags.len()
        };

        if requeued > 0 {
            self.stats
                .redelivered
                .fetch_add(requeued as u64, Ordering::Relaxed);
            warn!(
                queue = queue,
                consumer = %consumer,
                requeued = requeued,
                "Consumer detached with unacknowledged messages"
            );
            self.available.notify_waiters();
        } else {
            info!(queue = queue, consumer = %consumer, "Consumer detached");
        }

        // Nobody listening is fine.
        let _ = self.membership.send(MembershipEvent::ConsumerDetached {
            queue: queue.to_string(),
            consumer,
        });
    }
}

/// In-memory implementation of the message bus.
///
/// Suitable for single-process operation and tests; a deployment across
/// processes would put a broker behind the same [`MessageBus`] trait.
pub struct InMemoryQueueBus {
    inner: Arc<BusInner>,
    capacity: usize,
}

impl InMemoryQueueBus {
    /// Create a new in-memory bus with default membership channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with the given membership channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (membership, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState::default()),
                available: Notify::new(),
                membership,
                next_tag: AtomicU64::new(1),
                next_consumer: AtomicU64::new(1),
                stats: BusStats::default(),
            }),
            capacity,
        }
    }

    /// Close the bus. Pending and future `consume` calls fail with
    /// `BusError::Closed`; stored messages are kept.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.available.notify_waiters();
        info!("Message bus closed");
    }

    /// Number of messages waiting on `queue` (not counting outstanding ones).
    #[must_use]
    pub fn depth(&self, queue: &str) -> usize {
        self.inner
            .state
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.ready.len())
    }

    /// Number of messages delivered on `queue` but not yet settled.
    #[must_use]
    pub fn in_flight(&self, queue: &str) -> usize {
        self.inner
            .state
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.in_flight.len())
    }

    /// Get the bus counters.
    #[must_use]
    pub fn stats(&self) -> &BusStats {
        &self.inner.stats
    }

    /// Get the membership channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryQueueBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject queue names the bus cannot address.
///
/// # Errors
///
/// * `BusError::InvalidQueue` - The name is empty or whitespace
pub fn check_queue(queue: &str) -> Result<(), BusError> {
    if queue.trim().is_empty() {
        return Err(BusError::InvalidQueue(queue.to_string()));
    }
    Ok(())
}

#[async_trait]
impl MessageBus for InMemoryQueueBus {
    type Consumer = InMemoryConsumer;

    async fn send(&self, queue: &str, message: BusMessage) -> Result<(), BusError> {
        check_queue(queue)?;
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(BusError::Closed);
            }
            debug!(
                queue = queue,
                correlation_id = %message.correlation_id,
                "Message sent"
            );
            state
                .queues
                .entry(queue.to_string())
                .or_default()
                .ready
                .push_back(QueuedMessage {
                    message,
                    delivery_count: 0,
                });
        }
        self.inner.stats.sent.fetch_add(1, Ordering::Relaxed);
        self.inner.available.notify_waiters();
        Ok(())
    }

    fn attach(&self, queue: &str) -> Result<Self::Consumer, BusError> {
        check_queue(queue)?;
        let id = ConsumerId(self.inner.next_consumer.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(BusError::Closed);
            }
            state
                .queues
                .entry(queue.to_string())
                .or_default()
                .consumers
                .insert(id);
        }

        info!(queue = queue, consumer = %id, "Consumer attached");
        let _ = self.inner.membership.send(MembershipEvent::ConsumerAttached {
            queue: queue.to_string(),
            consumer: id,
        });

        Ok(InMemoryConsumer::new(id, queue.to_string(), self.inner.clone()))
    }

    fn subscribe_membership(&self, filter: MembershipFilter) -> MembershipSubscription {
        MembershipSubscription::new(self.inner.membership.subscribe(), filter)
    }

    fn consumers(&self, queue: &str) -> Vec<ConsumerId> {
        self.inner
            .state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.consumers.iter().copied().collect())
            .unwrap_or_default()
    }
}
