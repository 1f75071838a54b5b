//! # Membership Events
//!
//! Consumer attach/detach notifications published by the bus.
//! These are independent of job traffic: an idle consumer is still a member.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a consumer attached to a queue.
///
/// Carries no state of its own; it only distinguishes one attachment from
/// another for the lifetime of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// A change in the set of consumers attached to a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipEvent {
    /// A consumer started competing for messages on `queue`.
    ConsumerAttached { queue: String, consumer: ConsumerId },

    /// A consumer left `queue`, cleanly or because its connection died.
    /// Its unacknowledged messages have already been made available again.
    ConsumerDetached { queue: String, consumer: ConsumerId },
}

impl MembershipEvent {
    /// The queue this event concerns.
    #[must_use]
    pub fn queue(&self) -> &str {
        match self {
            MembershipEvent::ConsumerAttached { queue, .. }
            | MembershipEvent::ConsumerDetached { queue, .. } => queue,
        }
    }

    /// The consumer this event concerns.
    #[must_use]
    pub fn consumer(&self) -> ConsumerId {
        match self {
            MembershipEvent::ConsumerAttached { consumer, .. }
            | MembershipEvent::ConsumerDetached { consumer, .. } => *consumer,
        }
    }
}

/// Filter for membership subscriptions.
#[derive(Debug, Clone, Default)]
pub struct MembershipFilter {
    /// Queues to receive events for (empty = all).
    pub queues: Vec<String>,
}

impl MembershipFilter {
    /// Create a filter that accepts all queues.
    #[must_use]
    pub fn all() -> Self {
        Self { queues: Vec::new() }
    }

    /// Create a filter for a single queue.
    #[must_use]
    pub fn queue(queue: impl Into<String>) -> Self {
        Self {
            queues: vec![queue.into()],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &MembershipEvent) -> bool {
        self.queues.is_empty() || self.queues.iter().any(|q| q == event.queue())
    }
}
