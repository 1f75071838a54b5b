//! # Verifier Worker Service
//!
//! Application service layer: the worker loop.
//!
//! ## Job Lifecycle
//!
//! ```text
//! consume ──→ decode ──→ verify ──→ publish result to reply_to ──→ ack
//!                │           │
//!                └───────────┴──→ Failure outcome (never a withheld ack)
//! ```
//!
//! The ack is withheld only when the worker itself stops: a publish or bus
//! failure ends the loop and the bus redelivers the job elsewhere.

use crate::domain::errors::WorkerError;
use crate::domain::rules::LedgerRules;
use crate::ports::inbound::TransactionVerifier;
use crate::ports::outbound::ResultPublisher;
use shared_bus::{check_queue, BusError, ConsumerId, Delivery, QueueConsumer};
use shared_types::{
    BusMessage, ResolvedTransaction, VerificationError, VerificationOutcome, VerificationRequest,
    VerificationResult,
};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl TransactionVerifier for LedgerRules {
    fn verify(&self, transaction: &ResolvedTransaction) -> Result<(), VerificationError> {
        self.check(transaction)
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Counters for one worker.
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    faults: AtomicU64,
    redeliveries: AtomicU64,
    discarded: AtomicU64,
}

impl WorkerStats {
    /// Jobs answered and acknowledged.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Jobs answered with `Success`.
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Jobs answered with `Failure`.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Failures caused by the verifier itself (panics, undecodable jobs).
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Jobs received that an earlier consumer left unacknowledged.
    pub fn redeliveries(&self) -> u64 {
        self.redeliveries.load(Ordering::Relaxed)
    }

    /// Jobs acknowledged without an answer because they named no reply queue.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Decode a job envelope and verify its transaction.
///
/// Pure: protocol problems become a `MalformedPayload` failure rather than
/// an error, so they are answered instead of redelivered forever.
pub fn decode_and_verify<V>(verifier: &V, message: &BusMessage) -> VerificationOutcome
where
    V: TransactionVerifier + ?Sized,
{
    if !message.is_supported_version() {
        return VerificationOutcome::Failure(VerificationError::MalformedPayload {
            reason: format!("unsupported envelope version {}", message.version),
        });
    }

    let request: VerificationRequest = match message.format.decode(&message.payload) {
        Ok(request) => request,
        Err(e) => return VerificationOutcome::Failure(e.into()),
    };

    if request.correlation_id != message.correlation_id {
        return VerificationOutcome::Failure(VerificationError::MalformedPayload {
            reason: format!(
                "correlation id mismatch: envelope {}, payload {}",
                message.correlation_id, request.correlation_id
            ),
        });
    }

    verifier.verify(&request.transaction).into()
}

fn panic_reason(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("verifier panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("verifier panicked: {s}")
    } else {
        "verifier panicked".to_string()
    }
}

/// Turns one delivery into one published result.
pub struct JobProcessor<P, V> {
    name: String,
    publisher: Arc<P>,
    verifier: Arc<V>,
    stats: Arc<WorkerStats>,
}

impl<P, V> JobProcessor<P, V>
where
    P: ResultPublisher,
    V: TransactionVerifier,
{
    pub fn new(name: impl Into<String>, publisher: Arc<P>, verifier: Arc<V>) -> Self {
        Self {
            name: name.into(),
            publisher,
            verifier,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    /// Worker name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Verify a delivered job, publish the result, then acknowledge.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the delivery unacknowledged, only when the
    /// result could not be published or the ack could not be recorded.
    pub async fn process(&self, delivery: Delivery) -> Result<(), WorkerError> {
        let message = delivery.message().clone();
        let correlation_id = message.correlation_id;

        if delivery.is_redelivery() {
            self.stats.redeliveries.fetch_add(1, Ordering::Relaxed);
            debug!(
                worker = %self.name,
                correlation_id = %correlation_id,
                delivery_count = delivery.delivery_count(),
                "Processing redelivered job"
            );
        }

        let reply_to = message
            .reply_to
            .clone()
            .filter(|queue| check_queue(queue).is_ok());
        let Some(reply_to) = reply_to else {
            warn!(
                worker = %self.name,
                correlation_id = %correlation_id,
                reply_to = ?message.reply_to,
                "Job has no usable reply queue, discarding"
            );
            delivery.ack()?;
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        };

        let format = message.format;
        let outcome = self.evaluate(message).await?;
        match &outcome {
            VerificationOutcome::Success => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            VerificationOutcome::Failure(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                if matches!(
                    err,
                    VerificationError::VerifierFault { .. }
                        | VerificationError::MalformedPayload { .. }
                ) {
                    self.stats.faults.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        worker = %self.name,
                        correlation_id = %correlation_id,
                        error = %err,
                        "Job could not be verified"
                    );
                }
            }
        }

        let result = VerificationResult {
            correlation_id,
            outcome,
        };
        self.publisher.publish(&reply_to, format, &result).await?;
        delivery.ack()?;
        self.stats.processed.fetch_add(1, Ordering::Relaxed);

        debug!(
            worker = %self.name,
            correlation_id = %correlation_id,
            success = result.outcome.is_success(),
            "Job answered"
        );
        Ok(())
    }

    /// Run verification on the blocking pool, containing panics.
    async fn evaluate(&self, message: BusMessage) -> Result<VerificationOutcome, WorkerError> {
        let verifier = self.verifier.clone();
        let task = tokio::task::spawn_blocking(move || decode_and_verify(&*verifier, &message));

        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_panic() => Ok(VerificationOutcome::Failure(
                VerificationError::VerifierFault {
                    reason: panic_reason(e.into_panic()),
                },
            )),
            Err(_) => Err(WorkerError::Shutdown),
        }
    }
}

// =============================================================================
// WORKER LOOP
// =============================================================================

/// A stateless verifier attached to the request queue.
///
/// Dropping the worker (or aborting the task running [`run`](Self::run))
/// detaches its consumer; any job it held is redelivered.
pub struct VerifierWorker<C, P, V> {
    consumer: C,
    processor: JobProcessor<P, V>,
}

impl<C, P, V> VerifierWorker<C, P, V>
where
    C: QueueConsumer,
    P: ResultPublisher,
    V: TransactionVerifier,
{
    /// Create a worker from an attached consumer.
    ///
    /// # Arguments
    /// * `consumer` - Consumer attached to the request queue
    /// * `processor` - Verifies jobs and publishes their results
    pub fn new(consumer: C, processor: JobProcessor<P, V>) -> Self {
        Self {
            consumer,
            processor,
        }
    }

    /// Bus identity of this worker.
    pub fn id(&self) -> ConsumerId {
        self.consumer.id()
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.processor.stats()
    }

    /// Process jobs one at a time until the bus closes or a job cannot be
    /// answered.
    ///
    /// # Errors
    ///
    /// * `WorkerError::Bus` - The bus failed (other than closing)
    /// * `WorkerError::Codec` - A result could not be encoded
    /// * `WorkerError::Shutdown` - The runtime cancelled verification
    pub async fn run(mut self) -> Result<(), WorkerError> {
        info!(
            worker = %self.processor.name(),
            consumer = %self.consumer.id(),
            queue = %self.consumer.queue(),
            "Verifier worker started"
        );

        loop {
            let delivery = match self.consumer.consume().await {
                Ok(delivery) => delivery,
                Err(BusError::Closed) => {
                    info!(worker = %self.processor.name(), "Bus closed, verifier worker stopping");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = self.processor.process(delivery).await {
                warn!(
                    worker = %self.processor.name(),
                    error = %e,
                    "Verifier worker stopping, outstanding job will be redelivered"
                );
                return Err(e);
            }
        }
    }
}
