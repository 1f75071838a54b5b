//! # Runtime Container
//!
//! Configuration for a verification cluster: one bus, its requestors, and a
//! pool of verifier workers.

pub mod config;

pub use config::{ClusterConfig, ConfigError};
