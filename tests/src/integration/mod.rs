//! Cross-crate integration tests.

pub mod dispatch;
pub mod isolation;

use qc_verifier_worker::{FnVerifier, LedgerRules, TransactionVerifier};
use shared_types::{ResolvedTransaction, SignedTransaction, VerificationError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use verifier_runtime::LedgerGenerator;

/// Upper bound on any single wait in these tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve `count` valid transactions from a fixed-seed ledger.
pub async fn resolved_ledger(seed: u64, count: usize) -> Vec<ResolvedTransaction> {
    use qc_verification_requestor::TransactionResolver;

    let mut generator = LedgerGenerator::new(seed);
    let resolver = generator.resolver();
    let signed: Vec<SignedTransaction> = generator.generate(count);

    let mut resolved = Vec::with_capacity(count);
    for tx in &signed {
        match resolver.resolve(tx).await {
            Ok(tx) => resolved.push(tx),
            Err(e) => panic!("generated transaction {} did not resolve: {e}", tx.id()),
        }
    }
    resolved
}

/// The reference rules, slowed down so jobs are still in flight when a
/// test interferes with the pool.
pub fn slow_rules(delay: Duration) -> impl TransactionVerifier {
    let rules = LedgerRules::default();
    FnVerifier(move |tx: &ResolvedTransaction| -> Result<(), VerificationError> {
        std::thread::sleep(delay);
        rules.check(tx)
    })
}

pub fn rules() -> Arc<LedgerRules> {
    Arc::new(LedgerRules::default())
}

/// Poll `condition` until it holds, failing the test after [`TEST_TIMEOUT`].
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(TEST_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

/// Await `future`, failing the test after [`TEST_TIMEOUT`].
pub async fn within<F: Future>(what: &str, future: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
