//! # Verifier Runtime
//!
//! Wires the verification requestor and a pool of verifier workers onto one
//! bus.
//!
//! ## Modules
//!
//! - `container/` - Cluster configuration from defaults and `QC_*` variables
//! - `driver` - Start requestors, start and kill verifier processes
//! - `generator/` - Deterministic ledger of valid cash transactions
//! - `demo` - End-to-end run used by the binary
//!
//! ## Topology
//!
//! ```text
//!  Requestor ──verifier.requests──→ [ Verifier 1 | Verifier 2 | ... ]
//!      ↑                                         │
//!      └────verifier.responses.<name>.<id>───────┘
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod container;
pub mod demo;
pub mod driver;
pub mod generator;

pub use container::{ClusterConfig, ConfigError};
pub use demo::{run_demo, DemoReport};
pub use driver::{VerifierCluster, VerifierProcess};
pub use generator::{LedgerGenerator, Participant};
