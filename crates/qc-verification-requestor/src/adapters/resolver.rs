//! # In-Memory Resolver
//!
//! Resolves inputs against the outputs of transactions recorded earlier.
//! Used by the runtime's ledger generator and by tests.

use crate::ports::outbound::{ResolutionError, TransactionResolver};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    ResolvedTransaction, SecureHash, SignedTransaction, StateAndRef, StateRef, TransactionState,
};
use std::collections::HashMap;
use tracing::debug;

/// Resolver backed by a map of known transaction outputs.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    outputs: RwLock<HashMap<SecureHash, Vec<TransactionState>>>,
}

impl InMemoryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the outputs of `tx` available as inputs to later transactions.
    pub fn record(&self, tx: &SignedTransaction) {
        let id = tx.id();
        debug!(tx = %id, outputs = tx.wire.outputs.len(), "Recorded transaction outputs");
        self.outputs.write().insert(id, tx.wire.outputs.clone());
    }

    /// Number of recorded transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.read().is_empty()
    }

    /// Look up a single state.
    ///
    /// # Errors
    /// * `ResolutionError::UnknownState` - The producing transaction is unknown
    /// * `ResolutionError::MissingOutput` - The index is out of range
    pub fn lookup(&self, reference: &StateRef) -> Result<TransactionState, ResolutionError> {
        let outputs = self.outputs.read();
        let produced = outputs
            .get(&reference.txhash)
            .ok_or(ResolutionError::UnknownState(*reference))?;
        produced
            .get(reference.index as usize)
            .cloned()
            .ok_or(ResolutionError::MissingOutput {
                txhash: reference.txhash,
                index: reference.index,
            })
    }
}

#[async_trait]
impl TransactionResolver for InMemoryResolver {
    async fn resolve(&self, tx: &SignedTransaction) -> Result<ResolvedTransaction, ResolutionError> {
        let inputs = tx
            .wire
            .inputs
            .iter()
            .map(|reference| {
                self.lookup(reference).map(|state| StateAndRef {
                    state,
                    reference: *reference,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedTransaction {
            id: tx.id(),
            inputs,
            outputs: tx.wire.outputs.clone(),
            commands: tx.wire.commands.clone(),
            notary: tx.wire.notary.clone(),
            time_window: tx.wire.time_window,
            signatures: tx.signatures.clone(),
        })
    }
}
