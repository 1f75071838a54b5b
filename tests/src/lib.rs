//! # Verifier Pool Test Suite
//!
//! Unified test crate exercising the requestor, the verifier workers, and
//! the bus together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-crate dispatch properties
//!     ├── dispatch.rs   # Delivery, crash recovery, late workers
//!     └── isolation.rs  # Determinism, stale and duplicate results
//! tests/benches/
//! └── dispatch_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::dispatch
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod integration;
