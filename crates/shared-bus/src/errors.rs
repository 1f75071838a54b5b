//! # Bus Errors

use thiserror::Error;

/// Errors from bus operations.
///
/// Only connectivity problems live here. A message that fails to decode is
/// not a bus error; it is delivered like any other.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was closed.
    #[error("Message bus closed")]
    Closed,

    /// The delivery is no longer outstanding (its consumer detached and the
    /// message was handed back to the queue).
    #[error("Delivery {tag} on queue {queue} is no longer outstanding")]
    UnknownDelivery { queue: String, tag: u64 },

    /// The queue name is not usable.
    #[error("Invalid queue name: {0:?}")]
    InvalidQueue(String),
}

/// Errors from membership subscriptions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The subscriber fell behind and missed events; it must resynchronize
    /// from a membership snapshot.
    #[error("Subscriber lagged, {0} events dropped")]
    Lagged(u64),
}
