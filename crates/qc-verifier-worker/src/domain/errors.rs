//! # Worker Errors
//!
//! Errors that stop a verifier worker. Verification failures are not among
//! them: those are published as results.

use shared_bus::BusError;
use shared_types::CodecError;
use thiserror::Error;

/// Errors that end the worker loop.
///
/// Whatever delivery was outstanding when one of these is returned is left
/// unacknowledged, so the bus redelivers it to another verifier.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The bus rejected an operation.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// A result could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The runtime is shutting down; in-progress verification was cancelled.
    #[error("Worker shut down mid-verification")]
    Shutdown,
}
