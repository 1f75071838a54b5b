//! # Message Bus Adapter
//!
//! Wires a verifier worker to a [`MessageBus`].
//!
//! ## Message Flow
//!
//! ```text
//! [Requestor] ──job──→ verifier.requests ──→ [Worker] ──result──→ reply_to ──→ [Requestor]
//! ```
//!
//! Results are addressed by the request's `reply_to`, so several requestors
//! can share one pool of workers.

use crate::config::WorkerConfig;
use crate::domain::errors::WorkerError;
use crate::ports::inbound::TransactionVerifier;
use crate::ports::outbound::ResultPublisher;
use crate::service::{JobProcessor, VerifierWorker};
use async_trait::async_trait;
use shared_bus::MessageBus;
use shared_types::{BusMessage, VerificationResult, WireFormat};
use std::sync::Arc;

/// Publishes results as response envelopes on the bus.
pub struct BusResultPublisher<B> {
    bus: Arc<B>,
}

impl<B: MessageBus> BusResultPublisher<B> {
    pub fn new(bus: Arc<B>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<B: MessageBus> ResultPublisher for BusResultPublisher<B> {
    async fn publish(
        &self,
        reply_to: &str,
        format: WireFormat,
        result: &VerificationResult,
    ) -> Result<(), WorkerError> {
        let payload = format.encode(result)?;
        let message = BusMessage::response(result.correlation_id, format, payload);
        self.bus.send(reply_to, message).await?;
        Ok(())
    }
}

/// A worker attached to a bus.
pub type BusVerifierWorker<B, V> =
    VerifierWorker<<B as MessageBus>::Consumer, BusResultPublisher<B>, V>;

/// Attach a new verifier to the request queue named in `config`.
///
/// The bus announces the attachment immediately; the worker starts taking
/// jobs once [`VerifierWorker::run`] is polled.
///
/// # Errors
///
/// * `WorkerError::Bus` - The bus is closed or the queue name is invalid
pub fn attach_worker<B, V>(
    bus: &Arc<B>,
    verifier: Arc<V>,
    config: &WorkerConfig,
) -> Result<BusVerifierWorker<B, V>, WorkerError>
where
    B: MessageBus,
    V: TransactionVerifier,
{
    let consumer = bus.attach(&config.request_queue)?;
    let publisher = Arc::new(BusResultPublisher::new(bus.clone()));
    Ok(VerifierWorker::new(
        consumer,
        JobProcessor::new(config.name.clone(), publisher, verifier),
    ))
}
