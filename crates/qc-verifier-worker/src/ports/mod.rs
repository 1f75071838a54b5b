//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: the verification function the worker runs
//! - **Outbound (Driven)**: where results are sent

pub mod inbound;
pub mod outbound;
