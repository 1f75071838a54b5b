//! # Queue Consumers
//!
//! Defines the consuming side of the bus: competing consumers, deliveries
//! with acknowledgment, and membership subscriptions.
//!
//! ## Delivery Contract
//!
//! A [`Delivery`] is outstanding until it is acknowledged. Acknowledging
//! removes the message permanently. Nacking it, dropping it, or detaching its
//! consumer hands the message back to the queue for another consumer.

use crate::errors::{BusError, SubscriptionError};
use crate::events::{ConsumerId, MembershipEvent, MembershipFilter};
use crate::publisher::{BusInner, Settlement};
use async_trait::async_trait;
use shared_types::BusMessage;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Settles one outstanding delivery.
pub trait AckHandle: Send {
    /// Remove the message from the queue permanently.
    fn ack(self: Box<Self>) -> Result<(), BusError>;

    /// Return the message to the queue for redelivery.
    fn nack(self: Box<Self>) -> Result<(), BusError>;
}

/// A message handed to exactly one consumer, plus the means to settle it.
pub struct Delivery {
    message: BusMessage,
    delivery_count: u32,
    handle: Box<dyn AckHandle>,
}

impl Delivery {
    /// Wrap a message and its settlement handle.
    pub fn new(message: BusMessage, delivery_count: u32, handle: Box<dyn AckHandle>) -> Self {
        Self {
            message,
            delivery_count,
            handle,
        }
    }

    /// The delivered message.
    #[must_use]
    pub fn message(&self) -> &BusMessage {
        &self.message
    }

    /// How many times this message has been handed out, including this one.
    #[must_use]
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Whether an earlier delivery of this message went unacknowledged.
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }

    /// Acknowledge the message.
    pub fn ack(self) -> Result<(), BusError> {
        self.handle.ack()
    }

    /// Reject the message so another consumer can take it.
    pub fn nack(self) -> Result<(), BusError> {
        self.handle.nack()
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message_id", &self.message.message_id)
            .field("correlation_id", &self.message.correlation_id)
            .field("delivery_count", &self.delivery_count)
            .finish_non_exhaustive()
    }
}

/// A consumer attached to one queue.
///
/// Dropping the consumer detaches it: the bus publishes
/// [`MembershipEvent::ConsumerDetached`] and redelivers anything it left
/// unacknowledged.
#[async_trait]
pub trait QueueConsumer: Send + 'static {
    /// Identity of this attachment.
    fn id(&self) -> ConsumerId;

    /// Queue this consumer is attached to.
    fn queue(&self) -> &str;

    /// Wait until a message is available and take it.
    ///
    /// # Errors
    ///
    /// - `BusError::Closed` - The bus was closed
    async fn consume(&mut self) -> Result<Delivery, BusError>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// Consumer handle for [`InMemoryQueueBus`](crate::InMemoryQueueBus).
pub struct InMemoryConsumer {
    id: ConsumerId,
    queue: String,
    inner: Arc<BusInner>,
}

impl InMemoryConsumer {
    pub(crate) fn new(id: ConsumerId, queue: String, inner: Arc<BusInner>) -> Self {
        Self { id, queue, inner }
    }
}

#[async_trait]
impl QueueConsumer for InMemoryConsumer {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    async fn consume(&mut self) -> Result<Delivery, BusError> {
        loop {
            // Register for wakeups before looking, so a send that lands in
            // between is not missed.
            let notified = self.inner.notified();

            if let Some((tag, queued)) = self.inner.try_take(&self.queue, self.id)? {
                let handle = InMemoryAck {
                    inner: self.inner.clone(),
                    queue: self.queue.clone(),
                    tag,
                    settled: false,
                };
                return Ok(Delivery::new(
                    queued.message,
                    queued.delivery_count,
                    Box::new(handle),
                ));
            }

            notified.await;
        }
    }
}

impl Drop for InMemoryConsumer {
    fn drop(&mut self) {
        self.inner.detach(&self.queue, self.id);
    }
}

impl fmt::Debug for InMemoryConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryConsumer")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .finish()
    }
}

/// Settlement handle for an in-memory delivery. Unsettled on drop means nack.
struct InMemoryAck {
    inner: Arc<BusInner>,
    queue: String,
    tag: u64,
    settled: bool,
}

impl AckHandle for InMemoryAck {
    fn ack(mut self: Box<Self>) -> Result<(), BusError> {
        self.settled = true;
        self.inner.settle(&self.queue, self.tag, Settlement::Ack)
    }

    fn nack(mut self: Box<Self>) -> Result<(), BusError> {
        self.settled = true;
        self.inner.settle(&self.queue, self.tag, Settlement::Nack)
    }
}

impl Drop for InMemoryAck {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Already requeued if the consumer detached first.
        if let Err(e) = self.inner.settle(&self.queue, self.tag, Settlement::Nack) {
            debug!(queue = %self.queue, tag = self.tag, error = %e, "Dropped delivery already settled");
        }
    }
}

// =============================================================================
// MEMBERSHIP SUBSCRIPTION
// =============================================================================

/// A subscription handle for receiving membership events.
pub struct MembershipSubscription {
    receiver: broadcast::Receiver<MembershipEvent>,
    filter: MembershipFilter,
}

impl MembershipSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<MembershipEvent>, filter: MembershipFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::Closed` - The bus was dropped
    /// - `SubscriptionError::Lagged` - Events were missed; resynchronize
    pub async fn recv(&mut self) -> Result<MembershipEvent, SubscriptionError> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Membership subscriber lagged");
                    return Err(SubscriptionError::Lagged(count));
                }
            };

            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    pub fn try_recv(&mut self) -> Result<Option<MembershipEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    return Err(SubscriptionError::Lagged(count))
                }
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &MembershipFilter {
        &self.filter
    }
}
