//! # Domain Layer
//!
//! The correlation table and the completion handles it hands out.

pub mod handle;
pub mod pending;
pub mod recent;
