//! # Result Isolation Tests
//!
//! Verification is a pure function of the job, so repeating it anywhere
//! gives the same answer. Results that arrive for ids no longer pending,
//! whether redelivered duplicates or strays, never touch other entries.

#[cfg(test)]
mod tests {
    use crate::integration::{eventually, resolved_ledger, rules, within, TEST_TIMEOUT};
    use futures::future::join_all;
    use qc_verification_requestor::{RequestorConfig, RequestorError, VerificationRequestor};
    use qc_verifier_worker::WorkerConfig;
    use shared_bus::{InMemoryQueueBus, MessageBus, QueueConsumer, VERIFICATION_REQUESTS_QUEUE};
    use shared_types::{
        BusMessage, CorrelationId, VerificationError, VerificationOutcome, VerificationResult,
        WireFormat,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use verifier_runtime::VerifierCluster;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn reply(bus: &InMemoryQueueBus, to: &str, id: CorrelationId, outcome: VerificationOutcome) {
        let result = VerificationResult {
            correlation_id: id,
            outcome,
        };
        let payload = WireFormat::Bincode.encode(&result).unwrap();
        bus.send(to, BusMessage::response(id, WireFormat::Bincode, payload))
            .await
            .unwrap();
    }

    // =============================================================================
    // DETERMINISM
    // =============================================================================

    /// The same job verified repeatedly, across workers and wire formats,
    /// always reaches the same outcome.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_repeated_verification_is_identical() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let json = cluster
            .start_requestor(RequestorConfig {
                wire_format: WireFormat::Json,
                ..RequestorConfig::named("json")
            })
            .unwrap();
        let bincode = cluster
            .start_requestor(RequestorConfig {
                wire_format: WireFormat::Bincode,
                ..RequestorConfig::named("bincode")
            })
            .unwrap();
        cluster.start_verifiers(3).unwrap();
        json.wait_until_number_of_verifiers(3, TEST_TIMEOUT)
            .await
            .unwrap();

        let valid = resolved_ledger(10, 1).await.remove(0);
        let mut forged = valid.clone();
        forged.signatures[0].bytes.0[0] ^= 0xFF;

        for tx in [valid, forged] {
            let mut handles = Vec::new();
            for _ in 0..10 {
                handles.push(json.verify_transaction(tx.clone()).await.unwrap());
                handles.push(bincode.verify_transaction(tx.clone()).await.unwrap());
            }
            let results = within("repeated results", join_all(handles)).await;
            assert!(results.iter().all(|r| *r == results[0]), "{results:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_forged_signature_is_reported() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        cluster.start_verifier().unwrap();

        let mut tx = resolved_ledger(11, 1).await.remove(0);
        tx.signatures[0].bytes.0[0] ^= 0xFF;
        let (id, signer) = (tx.id, tx.signatures[0].by);

        let outcome = within("failure", requestor.verify_transaction(tx).await.unwrap()).await;
        assert_eq!(
            outcome,
            Err(RequestorError::Verification(
                VerificationError::InvalidSignature { tx: id, signer }
            ))
        );
    }

    // =============================================================================
    // STALE AND DUPLICATE RESULTS
    // =============================================================================

    /// Acting as the verifier by hand: a duplicate and a stray result leave
    /// the other pending entry untouched.
    #[tokio::test]
    async fn test_stale_results_do_not_disturb_pending() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap();
        let mut verifier = bus.attach(VERIFICATION_REQUESTS_QUEUE).unwrap();

        let mut ledger = resolved_ledger(12, 2).await.into_iter();
        let first = requestor
            .verify_transaction(ledger.next().unwrap())
            .await
            .unwrap();
        let second = requestor
            .verify_transaction(ledger.next().unwrap())
            .await
            .unwrap();

        // Answer the first job.
        let job = verifier.consume().await.unwrap();
        let reply_to = job.message().reply_to.clone().unwrap();
        assert_eq!(job.message().correlation_id, first.correlation_id());
        reply(&bus, &reply_to, first.correlation_id(), VerificationOutcome::Success).await;
        job.ack().unwrap();
        assert_eq!(within("first result", first.clone()).await, Ok(()));

        // A late failure for the same id, then a result nobody asked for.
        let late = VerificationOutcome::Failure(VerificationError::MalformedPayload {
            reason: "late".into(),
        });
        reply(&bus, &reply_to, first.correlation_id(), late).await;
        reply(&bus, &reply_to, CorrelationId::new(), VerificationOutcome::Success).await;

        let stats = requestor.stats();
        eventually("stale results to be discarded", || {
            stats.total_duplicates.load(Ordering::Relaxed) == 1
                && stats.total_unknown.load(Ordering::Relaxed) == 1
        })
        .await;

        assert_eq!(first.peek(), Some(Ok(())));
        assert!(second.peek().is_none());
        assert_eq!(requestor.pending_count(), 1);

        // The second job is still answerable.
        let job = verifier.consume().await.unwrap();
        assert_eq!(job.message().correlation_id, second.correlation_id());
        reply(&bus, &reply_to, second.correlation_id(), VerificationOutcome::Success).await;
        job.ack().unwrap();
        assert_eq!(within("second result", second).await, Ok(()));
    }

    /// An undecodable result fails only the entry its envelope names.
    #[tokio::test]
    async fn test_malformed_result_fails_only_its_entry() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let requestor = VerificationRequestor::start(bus.clone(), RequestorConfig::default()).unwrap();

        let mut ledger = resolved_ledger(13, 2).await.into_iter();
        let broken = requestor
            .verify_transaction(ledger.next().unwrap())
            .await
            .unwrap();
        let intact = requestor
            .verify_transaction(ledger.next().unwrap())
            .await
            .unwrap();

        bus.send(
            requestor.response_queue(),
            BusMessage::response(broken.correlation_id(), WireFormat::Json, b"{".to_vec()),
        )
        .await
        .unwrap();

        let outcome = within("malformed result", broken).await;
        assert!(matches!(
            outcome,
            Err(RequestorError::Verification(VerificationError::MalformedPayload { .. }))
        ));
        assert!(intact.peek().is_none());
        assert_eq!(requestor.pending_count(), 1);
    }
}
