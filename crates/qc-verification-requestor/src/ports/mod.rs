//! # Ports Layer
//!
//! - **Outbound (Driven)**: transaction resolution, invoked before dispatch

pub mod outbound;
