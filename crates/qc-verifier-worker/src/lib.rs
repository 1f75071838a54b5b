//! # Verifier Worker (QC-VW)
//!
//! A stateless, crash-only verifier that competes for verification jobs on
//! the shared bus.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Ledger rules, the cash contract, ed25519 signatures
//! - **Ports Layer** (`ports/`): `TransactionVerifier` in, `ResultPublisher` out
//! - **Service Layer** (`service.rs`): The consume/verify/publish/ack loop
//! - **Adapters** (`adapters/`): Bus-backed result publishing and attachment
//!
//! ## Delivery Notes
//!
//! - A job is acknowledged only after its result is stored on the bus
//! - Invalid transactions, undecodable jobs, and verifier panics are all
//!   answered with a `Failure` outcome
//! - A worker that stops mid-job leaves it unacknowledged; the bus hands it
//!   to another worker

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::bus::{attach_worker, BusResultPublisher, BusVerifierWorker};
pub use config::WorkerConfig;
pub use domain::contracts::{CashContract, Contract, ContractSet, CASH_CONTRACT};
pub use domain::errors::WorkerError;
pub use domain::rules::LedgerRules;
pub use domain::signatures::{public_key, sign, verify_signatures};
pub use ports::inbound::{FnVerifier, TransactionVerifier};
pub use ports::outbound::ResultPublisher;
pub use service::{decode_and_verify, JobProcessor, VerifierWorker, WorkerStats};
