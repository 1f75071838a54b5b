//! # Verification Requestor (QC-VR)
//!
//! The ledger-node side of out-of-process verification: dispatches resolved
//! transactions to a pool of verifier workers over the shared bus and
//! completes each caller's handle exactly once.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Correlation table, completion handles,
//!   recent-completion cache
//! - **Ports Layer** (`ports/`): `TransactionResolver`
//! - **Service Layer** (`service.rs`): `VerificationRequestor`
//! - **Listener** (`listener.rs`): Drains the private response queue
//! - **Registry** (`registry.rs`): Verifier membership from attach/detach events
//!
//! ## Delivery Notes
//!
//! - At-least-once delivery on the bus, exactly-once completion here: a
//!   pending entry is removed in the same step that completes it
//! - Results for ids that are no longer pending are discarded
//! - Only bus failures end the requestor; verification failures are outcomes

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod listener;
pub mod ports;
pub mod registry;
pub mod service;

// Re-export public API
pub use adapters::resolver::InMemoryResolver;
pub use config::RequestorConfig;
pub use domain::handle::VerificationHandle;
pub use domain::pending::{Completion, PendingStats, PendingVerificationStore};
pub use domain::recent::RecentCompletions;
pub use errors::RequestorError;
pub use listener::decode_result;
pub use ports::outbound::{ResolutionError, TransactionResolver};
pub use registry::VerifierRegistry;
pub use service::VerificationRequestor;
