//! # Ledger Builder

use chrono::{Days, NaiveDate};
use ed25519_dalek::SigningKey;
use qc_verification_requestor::InMemoryResolver;
use qc_verifier_worker::{public_key, sign, CASH_CONTRACT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{
    Command, Party, SignedTransaction, StateRef, TimeWindow, TransactionState, WireTransaction,
};
use std::sync::Arc;
use tracing::debug;

/// A named identity and the key it signs with.
#[derive(Clone)]
pub struct Participant {
    pub party: Party,
    pub key: SigningKey,
}

impl Participant {
    fn generate(name: &str, rng: &mut StdRng) -> Self {
        let key = SigningKey::from_bytes(&rng.gen::<[u8; 32]>());
        Self {
            party: Party {
                name: name.to_string(),
                owning_key: public_key(&key),
            },
            key,
        }
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("party", &self.party)
            .finish_non_exhaustive()
    }
}

/// An unspent cash state and the index of its owner.
#[derive(Debug, Clone)]
struct Unspent {
    reference: StateRef,
    amount: u64,
    owner: usize,
}

/// Generates issue and move transactions among a fixed set of parties.
///
/// Each generated transaction is recorded in the generator's resolver, so
/// it can be resolved (and its outputs spent) immediately.
pub struct LedgerGenerator {
    rng: StdRng,
    notary: Party,
    participants: Vec<Participant>,
    unspent: Vec<Unspent>,
    resolver: Arc<InMemoryResolver>,
    epoch: NaiveDate,
}

const PARTY_NAMES: [&str; 4] = ["Alice", "Bob", "Carol", "Dave"];

impl LedgerGenerator {
    /// Create a generator with four parties and a notary, all derived from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let notary = Participant::generate("Notary", &mut rng).party;
        let participants = PARTY_NAMES
            .iter()
            .map(|name| Participant::generate(name, &mut rng))
            .collect();

        Self {
            rng,
            notary,
            participants,
            unspent: Vec::new(),
            resolver: Arc::new(InMemoryResolver::new()),
            epoch: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }

    /// Resolver holding every transaction generated so far.
    pub fn resolver(&self) -> Arc<InMemoryResolver> {
        self.resolver.clone()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn notary(&self) -> &Party {
        &self.notary
    }

    /// Generate `count` transactions.
    pub fn generate(&mut self, count: usize) -> Vec<SignedTransaction> {
        (0..count).map(|_| self.next_transaction()).collect()
    }

    /// Generate one transaction: a move when there is cash to spend (most of
    /// the time), otherwise an issue.
    pub fn next_transaction(&mut self) -> SignedTransaction {
        let tx = if self.unspent.is_empty() || self.rng.gen_bool(0.3) {
            self.issue()
        } else {
            self.transfer()
        };
        self.resolver.record(&tx);
        tx
    }

    fn cash(&self, owner: usize, amount: u64) -> TransactionState {
        TransactionState {
            contract: CASH_CONTRACT.to_string(),
            owner: self.participants[owner].party.clone(),
            amount,
            notary: self.notary.clone(),
        }
    }

    fn issue(&mut self) -> SignedTransaction {
        let owner = self.rng.gen_range(0..self.participants.len());
        let amount = self.rng.gen_range(1..=1_000);
        let time_window = if self.rng.gen_bool(0.5) {
            let from = self.epoch + Days::new(self.rng.gen_range(0..30));
            Some(TimeWindow {
                from: Some(from),
                until: Some(from + Days::new(self.rng.gen_range(0..30))),
            })
        } else {
            None
        };

        let wire = WireTransaction {
            inputs: vec![],
            outputs: vec![self.cash(owner, amount)],
            commands: vec![Command {
                contract: CASH_CONTRACT.to_string(),
                name: "Issue".to_string(),
                signers: vec![self.participants[owner].party.owning_key],
            }],
            notary: Some(self.notary.clone()),
            time_window,
        };
        self.seal(wire, owner)
    }

    fn transfer(&mut self) -> SignedTransaction {
        let spent = self.unspent.swap_remove(self.rng.gen_range(0..self.unspent.len()));
        let recipient = self.rng.gen_range(0..self.participants.len());

        let mut outputs = Vec::with_capacity(2);
        if spent.amount > 1 && self.rng.gen_bool(0.5) {
            let paid = self.rng.gen_range(1..spent.amount);
            outputs.push(self.cash(recipient, paid));
            outputs.push(self.cash(spent.owner, spent.amount - paid));
        } else {
            outputs.push(self.cash(recipient, spent.amount));
        }

        let wire = WireTransaction {
            inputs: vec![spent.reference],
            outputs,
            commands: vec![Command {
                contract: CASH_CONTRACT.to_string(),
                name: "Move".to_string(),
                signers: vec![self.participants[spent.owner].party.owning_key],
            }],
            notary: Some(self.notary.clone()),
            time_window: None,
        };
        self.seal(wire, spent.owner)
    }

    /// Sign with `signer` and make the outputs spendable.
    fn seal(&mut self, wire: WireTransaction, signer: usize) -> SignedTransaction {
        let id = wire.id();
        let signature = sign(&self.participants[signer].key, &id);

        for (index, output) in wire.outputs.iter().enumerate() {
            let owner = self
                .participants
                .iter()
                .position(|p| p.party == output.owner)
                .unwrap_or(signer);
            self.unspent.push(Unspent {
                reference: StateRef {
                    txhash: id,
                    index: index as u32,
                },
                amount: output.amount,
                owner,
            });
        }

        debug!(tx = %id, inputs = wire.inputs.len(), outputs = wire.outputs.len(), "Generated transaction");
        SignedTransaction {
            wire,
            signatures: vec![signature],
        }
    }
}
