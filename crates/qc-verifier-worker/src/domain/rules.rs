//! # Ledger Rules
//!
//! The reference verification function. Pure: the verdict depends only on
//! the resolved transaction, so every worker reaches the same outcome.
//!
//! ## Check Order
//!
//! 1. Transaction id matches the content
//! 2. At least one command
//! 3. No input consumed twice
//! 4. Notary named when inputs are consumed, and it controls every input
//! 5. Time window does not end before it starts
//! 6. Signatures (see [`signatures`](super::signatures))
//! 7. Contracts (see [`contracts`](super::contracts))
//!
//! The first failing check determines the reported error.

use super::contracts::ContractSet;
use super::signatures::verify_signatures;
use shared_types::{ResolvedTransaction, StateRef, VerificationError};
use std::collections::HashSet;

/// Verifies resolved transactions against the ledger rules and a set of
/// contracts.
#[derive(Debug, Clone)]
pub struct LedgerRules {
    contracts: ContractSet,
}

impl LedgerRules {
    #[must_use]
    pub fn new(contracts: ContractSet) -> Self {
        Self { contracts }
    }

    /// Run every check in order.
    ///
    /// # Errors
    ///
    /// The first rule the transaction breaks.
    pub fn check(&self, tx: &ResolvedTransaction) -> Result<(), VerificationError> {
        check_id(tx)?;
        check_commands(tx)?;
        check_inputs_unique(tx)?;
        check_notary(tx)?;
        check_time_window(tx)?;
        verify_signatures(tx)?;
        self.contracts.verify(tx)
    }
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self::new(ContractSet::standard())
    }
}

fn check_id(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    let computed = tx.to_wire().id();
    if computed != tx.id {
        return Err(VerificationError::TransactionIdMismatch {
            claimed: tx.id,
            computed,
        });
    }
    Ok(())
}

fn check_commands(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    if tx.commands.is_empty() {
        return Err(VerificationError::MissingCommands { tx: tx.id });
    }
    Ok(())
}

fn check_inputs_unique(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    let mut seen: HashSet<StateRef> = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input.reference) {
            return Err(VerificationError::DuplicateInput {
                tx: tx.id,
                input: input.reference,
            });
        }
    }
    Ok(())
}

fn check_notary(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    if tx.inputs.is_empty() {
        return Ok(());
    }
    let notary = tx
        .notary
        .as_ref()
        .ok_or(VerificationError::MissingNotary { tx: tx.id })?;

    match tx.inputs.iter().find(|i| &i.state.notary != notary) {
        Some(input) => Err(VerificationError::NotaryMismatch {
            input: input.reference,
            expected: notary.name.clone(),
            found: input.state.notary.name.clone(),
        }),
        None => Ok(()),
    }
}

fn check_time_window(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    if let Some(window) = tx.time_window {
        if let (Some(from), Some(until)) = (window.from, window.until) {
            if until < from {
                return Err(VerificationError::InvalidTimeWindow { tx: tx.id });
            }
        }
    }
    Ok(())
}
