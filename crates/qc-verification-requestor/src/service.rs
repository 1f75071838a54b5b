//! # Verification Requestor Service
//!
//! Application service layer: dispatches verification jobs to the verifier
//! pool and matches results back to callers.
//!
//! ## Request State Machine
//!
//! ```text
//! Submitted ──(pending entry inserted, job sent)──→ Dispatched
//!     Dispatched ──(result arrives)──→ Completed-Success | Completed-Failure
//! ```
//!
//! Redelivery between verifiers happens on the bus and is invisible here.
//! Submission never waits for a verifier to exist: jobs queue until one
//! attaches.

use crate::config::RequestorConfig;
use crate::domain::handle::VerificationHandle;
use crate::domain::pending::{PendingStats, PendingVerificationStore};
use crate::errors::RequestorError;
use crate::listener::run_listener;
use crate::ports::outbound::TransactionResolver;
use crate::registry::VerifierRegistry;
use parking_lot::Mutex;
use shared_bus::{ConsumerId, MessageBus};
use shared_types::{BusMessage, ResolvedTransaction, SignedTransaction, VerificationRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Dispatches transactions to out-of-process verifiers.
pub struct VerificationRequestor<B: MessageBus> {
    bus: Arc<B>,
    config: RequestorConfig,
    response_queue: String,
    store: Arc<PendingVerificationStore>,
    registry: VerifierRegistry,
    in_flight: Option<Arc<Semaphore>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<B: MessageBus> VerificationRequestor<B> {
    /// Attach a private response queue, start the result listener, and
    /// start tracking verifiers.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `RequestorError::InvalidConfig` - `max_in_flight` is zero
    /// * `RequestorError::Bus` - The response queue could not be attached
    pub fn start(bus: Arc<B>, config: RequestorConfig) -> Result<Self, RequestorError> {
        if config.max_in_flight == Some(0) {
            return Err(RequestorError::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }

        let suffix = Uuid::new_v4().simple().to_string();
        let response_queue = format!(
            "{}.{}.{}",
            config.response_prefix,
            config.name,
            &suffix[..8]
        );

        let store = Arc::new(PendingVerificationStore::new(config.recent_ttl));
        let consumer = bus.attach(&response_queue)?;
        let registry = VerifierRegistry::start(&bus, &config.request_queue);
        let listener = tokio::spawn(run_listener(consumer, store.clone(), config.name.clone()));

        info!(
            requestor = %config.name,
            request_queue = %config.request_queue,
            response_queue = %response_queue,
            wire_format = %config.wire_format,
            max_in_flight = ?config.max_in_flight,
            "Verification requestor started"
        );

        Ok(Self {
            bus,
            in_flight: config.max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            config,
            response_queue,
            store,
            registry,
            listener: Mutex::new(Some(listener)),
            closed: AtomicBool::new(false),
        })
    }

    /// Dispatch a resolved transaction for verification.
    ///
    /// Returns as soon as the job is stored on the bus. The handle resolves
    /// when a verifier's result arrives. With an in-flight bound configured,
    /// this first waits for a free slot.
    ///
    /// # Errors
    ///
    /// * `RequestorError::Closed` - The requestor was shut down
    /// * `RequestorError::Codec` - The request could not be encoded
    /// * `RequestorError::Bus` - The job could not be stored
    pub async fn verify_transaction(
        &self,
        transaction: ResolvedTransaction,
    ) -> Result<VerificationHandle, RequestorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RequestorError::Closed);
        }

        let permit = match &self.in_flight {
            Some(slots) => Some(
                slots
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| RequestorError::Closed)?,
            ),
            None => None,
        };

        // The entry must exist before the job can possibly be answered.
        let (correlation_id, handle) = self.store.register(permit);
        // A shutdown that drained the table before this insert would leave
        // the entry with no listener and no close_all to resolve it.
        if self.closed.load(Ordering::SeqCst) {
            self.store.cancel(&correlation_id);
            return Err(RequestorError::Closed);
        }
        let tx_id = transaction.id;

        let request = VerificationRequest {
            correlation_id,
            transaction,
        };
        let format = self.config.wire_format;
        let payload = match format.encode(&request) {
            Ok(payload) => payload,
            Err(e) => {
                self.store.cancel(&correlation_id);
                return Err(e.into());
            }
        };

        let message = BusMessage::request(correlation_id, &self.response_queue, format, payload);
        if let Err(e) = self.bus.send(&self.config.request_queue, message).await {
            self.store.cancel(&correlation_id);
            error!(
                requestor = %self.config.name,
                correlation_id = %correlation_id,
                error = %e,
                "Failed to dispatch verification request"
            );
            return Err(e.into());
        }

        debug!(
            requestor = %self.config.name,
            correlation_id = %correlation_id,
            tx = %tx_id,
            "Verification requested"
        );
        Ok(handle)
    }

    /// Resolve a signed transaction's inputs, then dispatch it.
    ///
    /// # Errors
    ///
    /// * `RequestorError::Resolution` - An input could not be resolved
    /// * Any error from [`verify_transaction`](Self::verify_transaction)
    pub async fn resolve_and_verify<R>(
        &self,
        resolver: &R,
        transaction: &SignedTransaction,
    ) -> Result<VerificationHandle, RequestorError>
    where
        R: TransactionResolver + ?Sized,
    {
        let resolved = resolver.resolve(transaction).await?;
        self.verify_transaction(resolved).await
    }

    /// Number of verifiers currently attached to the request queue.
    pub fn verifier_count(&self) -> usize {
        self.registry.verifier_count()
    }

    /// Identities of the verifiers currently attached.
    pub fn verifiers(&self) -> Vec<ConsumerId> {
        self.registry.verifiers()
    }

    /// Wait until at least `required` verifiers are attached.
    ///
    /// # Errors
    ///
    /// * `RequestorError::VerifierTimeout` - Not enough verifiers within `timeout`
    pub async fn wait_until_number_of_verifiers(
        &self,
        required: usize,
        timeout: Duration,
    ) -> Result<(), RequestorError> {
        self.registry
            .wait_until_number_of_verifiers(required, timeout)
            .await
    }

    /// Number of verifications awaiting a result.
    pub fn pending_count(&self) -> usize {
        self.store.pending_count()
    }

    pub fn stats(&self) -> &PendingStats {
        self.store.stats()
    }

    /// This requestor's private response queue.
    pub fn response_queue(&self) -> &str {
        &self.response_queue
    }

    pub fn config(&self) -> &RequestorConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the result listener and fail every pending handle with `Closed`.
    ///
    /// Jobs already on the bus are not withdrawn; their results are never
    /// collected. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        if let Some(slots) = &self.in_flight {
            slots.close();
        }
        let dropped = self.store.close_all();
        info!(
            requestor = %self.config.name,
            dropped = dropped,
            "Verification requestor shut down"
        );
    }
}

impl<B: MessageBus> Drop for VerificationRequestor<B> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{InMemoryQueueBus, QueueConsumer, VERIFICATION_REQUESTS_QUEUE};
    use shared_types::{
        SecureHash, VerificationError, VerificationOutcome, VerificationResult, WireFormat,
    };
    use tokio::time::timeout;

    fn transaction(tag: &[u8]) -> ResolvedTransaction {
        ResolvedTransaction {
            id: SecureHash::sha256(tag),
            inputs: vec![],
            outputs: vec![],
            commands: vec![],
            notary: None,
            time_window: None,
            signatures: vec![],
        }
    }

    /// Answers one job by hand, the way a verifier would.
    async fn answer_one<C: QueueConsumer>(
        bus: &InMemoryQueueBus,
        jobs: &mut C,
        outcome: VerificationOutcome,
    ) -> VerificationRequest {
        let delivery = jobs.consume().await.unwrap();
        let message = delivery.message().clone();
        let request: VerificationRequest = message.format.decode(&message.payload).unwrap();
        let result = VerificationResult {
            correlation_id: request.correlation_id,
            outcome,
        };
        let reply = BusMessage::response(
            request.correlation_id,
            message.format,
            message.format.encode(&result).unwrap(),
        );
        bus.send(message.reply_to.as_deref().unwrap(), reply)
            .await
            .unwrap();
        delivery.ack().unwrap();
        request
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::named("alice")).unwrap();
        assert!(requestor.response_queue().starts_with("verifier.responses.alice."));

        let handle = requestor.verify_transaction(transaction(b"a")).await.unwrap();
        assert_eq!(requestor.pending_count(), 1);

        let mut jobs = bus.attach(VERIFICATION_REQUESTS_QUEUE).unwrap();
        let request = answer_one(&bus, &mut jobs, VerificationOutcome::Success).await;
        assert_eq!(request.correlation_id, handle.correlation_id());
        assert_eq!(request.transaction.id, SecureHash::sha256(b"a"));

        assert_eq!(timeout(Duration::from_secs(1), handle).await.expect("timeout"), Ok(()));
        assert_eq!(requestor.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_outcome() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let config = RequestorConfig {
            wire_format: WireFormat::Json,
            ..RequestorConfig::default()
        };
        let requestor = VerificationRequestor::start(bus.clone(), config).unwrap();
        let handle = requestor.verify_transaction(transaction(b"bad")).await.unwrap();

        let err = VerificationError::MissingCommands {
            tx: SecureHash::sha256(b"bad"),
        };
        let mut jobs = bus.attach(VERIFICATION_REQUESTS_QUEUE).unwrap();
        answer_one(&bus, &mut jobs, VerificationOutcome::Failure(err.clone())).await;

        let result = timeout(Duration::from_secs(1), handle).await.expect("timeout");
        assert_eq!(result, Err(RequestorError::Verification(err.clone())));
        assert_eq!(result.unwrap_err().verification_error(), Some(&err));
    }

    #[tokio::test]
    async fn test_submit_without_verifiers_does_not_block() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap();
        assert_eq!(requestor.verifier_count(), 0);

        for i in 0..10u8 {
            timeout(
                Duration::from_millis(100),
                requestor.verify_transaction(transaction(&[i])),
            )
            .await
            .expect("submission blocked")
            .unwrap();
        }
        assert_eq!(bus.depth(VERIFICATION_REQUESTS_QUEUE), 10);
        assert_eq!(requestor.pending_count(), 10);
    }

    #[tokio::test]
    async fn test_in_flight_bound() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let config = RequestorConfig {
            max_in_flight: Some(1),
            ..RequestorConfig::default()
        };
        let requestor = VerificationRequestor::start(bus.clone(), config).unwrap();

        let first = requestor.verify_transaction(transaction(b"1")).await.unwrap();
        assert!(
            timeout(Duration::from_millis(30), requestor.verify_transaction(transaction(b"2")))
                .await
                .is_err(),
            "second submission should wait for a slot"
        );

        let mut jobs = bus.attach(VERIFICATION_REQUESTS_QUEUE).unwrap();
        answer_one(&bus, &mut jobs, VerificationOutcome::Success).await;
        first.await.unwrap();

        timeout(Duration::from_secs(1), requestor.verify_transaction(transaction(b"3")))
            .await
            .expect("slot released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_in_flight_rejected() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let config = RequestorConfig {
            max_in_flight: Some(0),
            ..RequestorConfig::default()
        };
        assert!(matches!(
            VerificationRequestor::start(bus, config),
            Err(RequestorError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_send_failure_withdraws_entry() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap();
        bus.close();

        let result = requestor.verify_transaction(transaction(b"x")).await;
        assert!(matches!(result, Err(RequestorError::Bus(_))));
        assert_eq!(requestor.pending_count(), 0);
        assert_eq!(requestor.stats().total_cancelled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_handles() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap();
        let handle = requestor.verify_transaction(transaction(b"never")).await.unwrap();

        requestor.shutdown();
        requestor.shutdown();
        assert!(requestor.is_closed());
        assert_eq!(handle.await, Err(RequestorError::Closed));
        assert!(matches!(
            requestor.verify_transaction(transaction(b"late")).await,
            Err(RequestorError::Closed)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_racing_submitters_leaves_no_orphans() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = Arc::new(
            VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap(),
        );

        let submitters: Vec<_> = (0..8u8)
            .map(|n| {
                let requestor = requestor.clone();
                tokio::spawn(async move {
                    let mut handles = Vec::new();
                    for i in 0..200u8 {
                        match requestor.verify_transaction(transaction(&[n, i])).await {
                            Ok(handle) => handles.push(handle),
                            Err(RequestorError::Closed) => break,
                            Err(e) => panic!("unexpected submit error: {e}"),
                        }
                        tokio::task::yield_now().await;
                    }
                    handles
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(2)).await;
        requestor.shutdown();

        for submitter in submitters {
            for handle in submitter.await.unwrap() {
                let outcome = timeout(Duration::from_secs(1), handle)
                    .await
                    .expect("every accepted handle resolves after shutdown");
                assert_eq!(outcome, Err(RequestorError::Closed));
            }
        }
        assert_eq!(requestor.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_two_requestors_share_a_queue() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let alice = VerificationRequestor::start(bus.clone(), RequestorConfig::named("alice")).unwrap();
        let bob = VerificationRequestor::start(bus.clone(), RequestorConfig::named("bob")).unwrap();
        assert_ne!(alice.response_queue(), bob.response_queue());

        let a = alice.verify_transaction(transaction(b"a")).await.unwrap();
        let b = bob.verify_transaction(transaction(b"b")).await.unwrap();

        let mut jobs = bus.attach(VERIFICATION_REQUESTS_QUEUE).unwrap();
        answer_one(&bus, &mut jobs, VerificationOutcome::Success).await;
        answer_one(&bus, &mut jobs, VerificationOutcome::Success).await;

        assert_eq!(timeout(Duration::from_secs(1), a).await.expect("timeout"), Ok(()));
        assert_eq!(timeout(Duration::from_secs(1), b).await.expect("timeout"), Ok(()));
    }
}
