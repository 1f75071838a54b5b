//! # Ledger Generator
//!
//! Produces a deterministic stream of valid, signed cash transactions for
//! demos, benchmarks, and tests.
//!
//! ## Properties
//!
//! - Same seed, same transactions, byte for byte
//! - Every transaction passes the reference ledger rules once resolved
//! - Later transactions spend outputs of earlier ones, so resolution has
//!   real work to do

pub mod ledger;

pub use ledger::{LedgerGenerator, Participant};
