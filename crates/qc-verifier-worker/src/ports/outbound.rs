//! # Outbound Ports (Driven Ports / SPI)
//!
//! Where a worker sends its results.

use crate::domain::errors::WorkerError;
use async_trait::async_trait;
use shared_types::{VerificationResult, WireFormat};

/// Delivers verification results back to the requestor that asked.
#[async_trait]
pub trait ResultPublisher: Send + Sync + 'static {
    /// Send `result` to the queue named by the request's `reply_to`,
    /// encoded with `format`.
    ///
    /// # Errors
    ///
    /// * `WorkerError::Bus` - The result could not be stored
    /// * `WorkerError::Codec` - The result could not be encoded
    async fn publish(
        &self,
        reply_to: &str,
        format: WireFormat,
        result: &VerificationResult,
    ) -> Result<(), WorkerError>;
}
