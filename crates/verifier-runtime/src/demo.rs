//! # Demo Run
//!
//! Starts a cluster from a [`ClusterConfig`], verifies a generated ledger
//! through it, and reports what happened.

use crate::container::ClusterConfig;
use crate::driver::VerifierCluster;
use crate::generator::LedgerGenerator;
use anyhow::{Context, Result};
use futures::future::join_all;
use qc_verification_requestor::RequestorError;
use qc_verifier_worker::LedgerRules;
use shared_bus::InMemoryQueueBus;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Summary of a demo run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub verifiers: usize,
    pub redelivered: u64,
    pub elapsed: Duration,
}

/// Run the demo end to end.
///
/// # Errors
///
/// Fails if a verifier cannot attach, the verifiers do not show up within
/// `verifier_wait`, or a request cannot be dispatched.
pub async fn run_demo(config: &ClusterConfig) -> Result<DemoReport> {
    let started = Instant::now();
    let bus = Arc::new(InMemoryQueueBus::new());
    let mut cluster = VerifierCluster::new(
        bus.clone(),
        Arc::new(LedgerRules::default()),
        config.worker.clone(),
    );

    let requestor = cluster
        .start_requestor(config.requestor.clone())
        .context("Failed to start requestor")?;
    cluster
        .start_verifiers(config.verifiers)
        .context("Failed to start verifiers")?;

    requestor
        .wait_until_number_of_verifiers(config.verifiers, config.verifier_wait)
        .await
        .context("Verifiers did not attach in time")?;
    info!(verifiers = requestor.verifier_count(), "Verifier pool ready");

    let mut generator = LedgerGenerator::new(config.ledger_seed);
    let resolver = generator.resolver();
    let transactions = generator.generate(config.demo_transactions);

    let mut handles = Vec::with_capacity(transactions.len());
    for tx in &transactions {
        let handle = requestor
            .resolve_and_verify(resolver.as_ref(), tx)
            .await
            .with_context(|| format!("Failed to dispatch transaction {}", tx.id()))?;
        handles.push(handle);
    }

    let mut succeeded = 0;
    let mut failed = 0;
    for (tx, result) in transactions.iter().zip(join_all(handles).await) {
        match result {
            Ok(()) => succeeded += 1,
            Err(RequestorError::Verification(e)) => {
                warn!(tx = %tx.id(), error = %e, "Transaction rejected");
                failed += 1;
            }
            Err(e) => return Err(e).context("Verification did not complete"),
        }
    }

    let report = DemoReport {
        submitted: transactions.len(),
        succeeded,
        failed,
        verifiers: cluster.running(),
        redelivered: bus.stats().redelivered(),
        elapsed: started.elapsed(),
    };
    info!(
        submitted = report.submitted,
        succeeded = report.succeeded,
        failed = report.failed,
        completed = requestor.stats().total_completed.load(Ordering::Relaxed),
        elapsed_ms = report.elapsed.as_millis(),
        "Demo finished"
    );

    requestor.shutdown();
    cluster.shutdown();
    Ok(report)
}
