//! # Inbound Ports (Driving Ports / API)
//!
//! The verification function a worker invokes for each job.

use shared_types::{ResolvedTransaction, VerificationError};

/// A pure verification function over fully resolved transactions.
///
/// Implementations must be deterministic and must not perform I/O: a job
/// may be verified more than once, on different workers, and every run has
/// to reach the same outcome. The worker calls this on a blocking thread,
/// so CPU-heavy work is fine.
pub trait TransactionVerifier: Send + Sync + 'static {
    /// Verify one transaction.
    ///
    /// # Errors
    ///
    /// The structured reason the transaction is invalid.
    fn verify(&self, transaction: &ResolvedTransaction) -> Result<(), VerificationError>;
}

impl<T: TransactionVerifier + ?Sized> TransactionVerifier for std::sync::Arc<T> {
    fn verify(&self, transaction: &ResolvedTransaction) -> Result<(), VerificationError> {
        (**self).verify(transaction)
    }
}

/// Adapts a closure into a [`TransactionVerifier`].
#[derive(Debug, Clone, Copy)]
pub struct FnVerifier<F>(pub F);

impl<F> TransactionVerifier for FnVerifier<F>
where
    F: Fn(&ResolvedTransaction) -> Result<(), VerificationError> + Send + Sync + 'static,
{
    fn verify(&self, transaction: &ResolvedTransaction) -> Result<(), VerificationError> {
        (self.0)(transaction)
    }
}
