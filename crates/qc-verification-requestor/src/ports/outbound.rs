//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the requestor needs but does not implement.

use async_trait::async_trait;
use shared_types::{ResolvedTransaction, SecureHash, SignedTransaction, StateRef};
use thiserror::Error;

/// Error from transaction resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// An input refers to a state the resolver has never seen.
    #[error("Unknown input state {0}")]
    UnknownState(StateRef),

    /// An input refers to an output index the producing transaction lacks.
    #[error("Transaction {txhash} has no output {index}")]
    MissingOutput { txhash: SecureHash, index: u32 },

    /// The backing store could not be reached.
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),
}

/// Dereferences a transaction's inputs so it can be verified in isolation.
///
/// Resolution happens on the requestor side, before dispatch: verifiers
/// never look anything up.
#[async_trait]
pub trait TransactionResolver: Send + Sync {
    /// Turn a signed wire transaction into a fully resolved one.
    ///
    /// # Errors
    /// * `ResolutionError::UnknownState` - An input is not known
    /// * `ResolutionError::MissingOutput` - An input points past the outputs of its source
    async fn resolve(&self, tx: &SignedTransaction) -> Result<ResolvedTransaction, ResolutionError>;
}
