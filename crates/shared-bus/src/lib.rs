//! # Shared Bus - Durable Queues for Out-of-Process Verification
//!
//! The bus abstraction the requestor and the verifier pool talk through.
//!
//! ## Contract
//!
//! - **send(queue, message)**: enqueue; never waits for a consumer
//! - **consume()**: block until a message is available; returns a [`Delivery`]
//! - **ack / nack**: acknowledge to remove, nack (or drop, or detach) to
//!   have the message redelivered to another consumer
//! - **membership**: consumers joining and leaving a queue are published as
//!   [`MembershipEvent`]s
//!
//! ## Point-to-Point Pattern
//!
//! ```text
//! ┌──────────────┐   send()   ┌──────────────────┐  consume()  ┌──────────────┐
//! │  Requestor   │ ─────────→ │ verifier.requests│ ──────────→ │ Verifier 1..N│
//! │              │            └──────────────────┘             │              │
//! │              │  consume() ┌──────────────────┐    send()   │              │
//! │              │ ←───────── │verifier.responses│ ←────────── │              │
//! └──────────────┘            └──────────────────┘             └──────────────┘
//! ```
//!
//! Redelivery after a consumer dies is the only failure-recovery primitive
//! the verification protocol relies on.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod errors;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use errors::{BusError, SubscriptionError};
pub use events::{ConsumerId, MembershipEvent, MembershipFilter};
pub use publisher::{check_queue, BusStats, InMemoryQueueBus, MessageBus};
pub use subscriber::{AckHandle, Delivery, InMemoryConsumer, MembershipSubscription, QueueConsumer};

/// Maximum membership events to buffer per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Queue every verifier competes on.
pub const VERIFICATION_REQUESTS_QUEUE: &str = "verifier.requests";

/// Prefix of the per-requestor response queues.
pub const VERIFICATION_RESPONSES_PREFIX: &str = "verifier.responses";
