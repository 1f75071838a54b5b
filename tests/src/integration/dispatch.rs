//! # Dispatch Integration Tests
//!
//! Requestor, worker pool and bus together: every submitted verification
//! resolves, whether the pool is steady, shrinking under crashes, or absent
//! when the jobs are sent.
//!
//! ## Flow Tested
//!
//! ```text
//! Requestor ──verifier.requests──→ Worker ──reply_to──→ Result Listener
//!                                    │
//!                         (killed) ──┴──→ nack ──→ redelivered to a survivor
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::{eventually, resolved_ledger, rules, slow_rules, within, TEST_TIMEOUT};
    use futures::future::join_all;
    use qc_verification_requestor::RequestorConfig;
    use qc_verifier_worker::WorkerConfig;
    use shared_bus::{InMemoryQueueBus, VERIFICATION_REQUESTS_QUEUE};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use verifier_runtime::VerifierCluster;

    // =============================================================================
    // STEADY POOL
    // =============================================================================

    /// One worker answers all 100 jobs.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_worker_verifies_all() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        cluster.start_verifier().unwrap();
        requestor
            .wait_until_number_of_verifiers(1, TEST_TIMEOUT)
            .await
            .unwrap();

        let mut handles = Vec::with_capacity(100);
        for tx in resolved_ledger(1, 100).await {
            handles.push(requestor.verify_transaction(tx).await.unwrap());
        }

        let results = within("100 results", join_all(handles)).await;
        assert!(results.iter().all(Result::is_ok), "{results:?}");
        assert_eq!(requestor.pending_count(), 0);
        eventually("worker to count its jobs", || cluster.processed() == 100).await;
    }

    /// Four competing workers: every correlation id completes exactly once.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_competing_workers_complete_each_job_once() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        cluster.start_verifiers(4).unwrap();
        requestor
            .wait_until_number_of_verifiers(4, TEST_TIMEOUT)
            .await
            .unwrap();

        let mut handles = Vec::with_capacity(100);
        for tx in resolved_ledger(2, 100).await {
            handles.push(requestor.verify_transaction(tx).await.unwrap());
        }
        let ids: HashSet<_> = handles.iter().map(|h| h.correlation_id()).collect();
        assert_eq!(ids.len(), 100);

        let results = within("100 results", join_all(handles)).await;
        assert!(results.iter().all(Result::is_ok));

        let stats = requestor.stats();
        assert_eq!(stats.total_registered.load(Ordering::Relaxed), 100);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 100);
        assert_eq!(stats.total_duplicates.load(Ordering::Relaxed), 0);
        assert_eq!(stats.total_unknown.load(Ordering::Relaxed), 0);
        eventually("workers to count their jobs", || cluster.processed() == 100).await;
        assert_eq!(bus.stats().redelivered(), 0);
    }

    // =============================================================================
    // CRASHES
    // =============================================================================

    /// Kill a worker when 66 jobs remain and another when 33 remain.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_survives_workers_killed_mid_run() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(
            bus.clone(),
            Arc::new(slow_rules(Duration::from_millis(5))),
            WorkerConfig::default(),
        );
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        cluster.start_verifiers(3).unwrap();
        requestor
            .wait_until_number_of_verifiers(3, TEST_TIMEOUT)
            .await
            .unwrap();

        let mut handles = Vec::with_capacity(100);
        for tx in resolved_ledger(3, 100).await {
            handles.push(requestor.verify_transaction(tx).await.unwrap());
        }

        eventually("66 jobs left", || requestor.pending_count() <= 66).await;
        assert!(cluster.kill_any().is_some());
        eventually("33 jobs left", || requestor.pending_count() <= 33).await;
        assert!(cluster.kill_any().is_some());
        assert_eq!(cluster.running(), 1);

        let results = within("100 results", join_all(handles)).await;
        assert_eq!(results.len(), 100);
        assert!(results.iter().all(Result::is_ok), "{results:?}");
        eventually("registry to see one verifier", || {
            requestor.verifier_count() == 1
        })
        .await;
    }

    /// A job held by a crashed worker is answered by its replacement.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_job_held_by_crashed_worker_is_redelivered() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(
            bus.clone(),
            Arc::new(slow_rules(Duration::from_millis(200))),
            WorkerConfig::default(),
        );
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        let first = cluster.start_verifier().unwrap();

        let tx = resolved_ledger(4, 1).await.remove(0);
        let handle = requestor.verify_transaction(tx).await.unwrap();
        eventually("job to be taken", || bus.in_flight(VERIFICATION_REQUESTS_QUEUE) == 1).await;

        assert!(cluster.kill_verifier(first));
        cluster.start_verifier().unwrap();

        assert_eq!(within("redelivered result", handle).await, Ok(()));
        assert_eq!(bus.stats().redelivered(), 1);
        eventually("replacement to count the job", || cluster.processed() == 1).await;
        assert_eq!(cluster.processes()[0].stats().redeliveries(), 1);
    }

    // =============================================================================
    // LATE POOL
    // =============================================================================

    /// Jobs sent before any worker exists wait on the bus.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jobs_wait_for_first_worker() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        assert_eq!(requestor.verifier_count(), 0);

        let mut handles = Vec::with_capacity(100);
        for tx in resolved_ledger(5, 100).await {
            handles.push(requestor.verify_transaction(tx).await.unwrap());
        }
        assert_eq!(requestor.pending_count(), 100);
        assert_eq!(bus.depth(VERIFICATION_REQUESTS_QUEUE), 100);
        assert!(handles.iter().all(|h| h.peek().is_none()));

        cluster.start_verifier().unwrap();
        requestor
            .wait_until_number_of_verifiers(1, TEST_TIMEOUT)
            .await
            .unwrap();

        let results = within("100 results", join_all(handles)).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(bus.depth(VERIFICATION_REQUESTS_QUEUE), 0);
    }

    /// With an in-flight bound, submission blocks until results free a slot.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_bound_with_late_worker() {
        let bus = Arc::new(InMemoryQueueBus::new());
        let mut cluster = VerifierCluster::new(bus.clone(), rules(), WorkerConfig::default());
        let requestor = Arc::new(
            cluster
                .start_requestor(RequestorConfig {
                    max_in_flight: Some(10),
                    ..RequestorConfig::default()
                })
                .unwrap(),
        );

        let submitter = {
            let requestor = requestor.clone();
            tokio::spawn(async move {
                let mut handles = Vec::with_capacity(30);
                for tx in resolved_ledger(6, 30).await {
                    handles.push(requestor.verify_transaction(tx).await.unwrap());
                }
                handles
            })
        };

        eventually("bound to fill", || requestor.pending_count() == 10).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(requestor.pending_count(), 10);
        assert!(!submitter.is_finished());

        cluster.start_verifier().unwrap();
        let handles = within("submission to finish", submitter).await.unwrap();
        let results = within("30 results", join_all(handles)).await;
        assert!(results.iter().all(Result::is_ok));
    }
}
