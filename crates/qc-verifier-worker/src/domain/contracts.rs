//! # Contract Verification
//!
//! Every contract named by a transaction (on an input, an output, or a
//! command) must accept it. A transaction naming a contract this worker does
//! not know is rejected rather than skipped.

use shared_types::{ResolvedTransaction, VerificationError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Name of the built-in fungible asset contract.
pub const CASH_CONTRACT: &str = "cash";

/// A contract's acceptance rule.
///
/// Implementations must be deterministic: the same transaction yields the
/// same verdict on every worker.
pub trait Contract: Send + Sync {
    /// Name that states and commands use to address this contract.
    fn name(&self) -> &str;

    /// Accept or reject the transaction, with a human-readable reason.
    fn verify(&self, tx: &ResolvedTransaction) -> Result<(), String>;
}

/// The contracts a verifier knows, keyed by name.
#[derive(Clone, Default)]
pub struct ContractSet {
    contracts: HashMap<String, Arc<dyn Contract>>,
}

impl ContractSet {
    /// An empty set. Every contract-bearing transaction is rejected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in contracts (`cash`).
    #[must_use]
    pub fn standard() -> Self {
        Self::empty().with(CashContract)
    }

    /// Add a contract, replacing any previous one with the same name.
    #[must_use]
    pub fn with(mut self, contract: impl Contract + 'static) -> Self {
        self.contracts
            .insert(contract.name().to_string(), Arc::new(contract));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Run every contract the transaction names, in name order.
    ///
    /// # Errors
    ///
    /// - `ContractRejection` - A contract is unknown or rejected the transaction
    pub fn verify(&self, tx: &ResolvedTransaction) -> Result<(), VerificationError> {
        for name in referenced_contracts(tx) {
            let reject = |reason: String| VerificationError::ContractRejection {
                tx: tx.id,
                contract: name.to_string(),
                reason,
            };
            let contract = self
                .contracts
                .get(name)
                .ok_or_else(|| reject("unknown contract".to_string()))?;
            contract.verify(tx).map_err(reject)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContractSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.contracts.keys().collect();
        names.sort();
        f.debug_struct("ContractSet").field("contracts", &names).finish()
    }
}

/// Contract names appearing anywhere in the transaction, sorted.
fn referenced_contracts(tx: &ResolvedTransaction) -> BTreeSet<&str> {
    tx.inputs
        .iter()
        .map(|i| i.state.contract.as_str())
        .chain(tx.outputs.iter().map(|o| o.contract.as_str()))
        .chain(tx.commands.iter().map(|c| c.contract.as_str()))
        .collect()
}

// =============================================================================
// CASH
// =============================================================================

/// Fungible asset contract.
///
/// - `Issue`: creates cash from nothing. No cash inputs, at least one cash
///   output, and someone must sign for it.
/// - `Move`: transfers existing cash. Amounts are conserved and every owner
///   of a consumed state signs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashContract;

impl Contract for CashContract {
    fn name(&self) -> &str {
        CASH_CONTRACT
    }

    fn verify(&self, tx: &ResolvedTransaction) -> Result<(), String> {
        let commands: Vec<_> = tx
            .commands
            .iter()
            .filter(|c| c.contract == CASH_CONTRACT)
            .collect();
        let command = match commands.as_slice() {
            [one] => *one,
            [] => return Err("no cash command".to_string()),
            _ => return Err(format!("expected one cash command, found {}", commands.len())),
        };

        let inputs: Vec<_> = tx
            .inputs
            .iter()
            .filter(|i| i.state.contract == CASH_CONTRACT)
            .collect();
        let outputs: Vec<_> = tx
            .outputs
            .iter()
            .filter(|o| o.contract == CASH_CONTRACT)
            .collect();

        if outputs.iter().any(|o| o.amount == 0) {
            return Err("output amounts must be positive".to_string());
        }

        match command.name.as_str() {
            "Issue" => {
                if !inputs.is_empty() {
                    return Err("issue must not consume cash".to_string());
                }
                if outputs.is_empty() {
                    return Err("issue must create cash".to_string());
                }
                if command.signers.is_empty() {
                    return Err("issue must be signed".to_string());
                }
                Ok(())
            }
            "Move" => {
                if inputs.is_empty() {
                    return Err("move must consume cash".to_string());
                }
                let consumed: u128 = inputs.iter().map(|i| u128::from(i.state.amount)).sum();
                let produced: u128 = outputs.iter().map(|o| u128::from(o.amount)).sum();
                if consumed != produced {
                    return Err(format!(
                        "amounts not conserved: consumed {consumed}, produced {produced}"
                    ));
                }
                if let Some(input) = inputs
                    .iter()
                    .find(|i| !command.signers.contains(&i.state.owner.owning_key))
                {
                    return Err(format!(
                        "owner {} of {} must sign the move",
                        input.state.owner, input.reference
                    ));
                }
                Ok(())
            }
            other => Err(format!("unknown cash command {other}")),
        }
    }
}
