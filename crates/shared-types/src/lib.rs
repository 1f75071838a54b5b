//! # Shared Types Crate
//!
//! This crate contains the ledger entities, the bus envelope, and the IPC
//! payloads exchanged between a verification requestor and its verifiers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-process types are defined here.
//! - **Envelope Integrity**: [`BusMessage`] is the sole wrapper for queue traffic.
//! - **Failures are data**: [`VerificationError`] crosses the bus inside a
//!   [`VerificationOutcome`]; it never describes a transport problem.

pub mod codec;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;

pub use codec::WireFormat;
pub use entities::*;
pub use envelope::BusMessage;
pub use errors::*;
pub use ipc::*;
