//! # Domain Layer
//!
//! Pure verification logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod contracts;
pub mod errors;
pub mod rules;
pub mod signatures;
