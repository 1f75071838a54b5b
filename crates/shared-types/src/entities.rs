//! # Core Ledger Entities
//!
//! Defines the ledger entities that travel between a requestor and the
//! verifier pool.
//!
//! ## Clusters
//!
//! - **Identity**: `SecureHash`, `PublicKey`, `Party`
//! - **States**: `StateRef`, `TransactionState`, `StateAndRef`
//! - **Transactions**: `WireTransaction`, `SignedTransaction`, `ResolvedTransaction`
//!
//! Binary encodings carry raw bytes; human-readable encodings (JSON) render
//! hashes, keys and signatures as lowercase hex.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, Bytes, IfIsHumanReadable};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Error parsing a hex-encoded value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseHexError {
    /// The input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded value has the wrong length.
    #[error("Expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let bytes = hex::decode(s).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseHexError::WrongLength { expected: N, actual })
}

/// A SHA-256 hash.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecureHash(#[serde_as(as = "IfIsHumanReadable<Hex, Bytes>")] pub [u8; 32]);

impl SecureHash {
    /// The all-zero hash.
    pub const ZERO: SecureHash = SecureHash([0u8; 32]);

    /// Hash arbitrary bytes with SHA-256.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Raw bytes of the hash.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short prefix for log lines.
    #[must_use]
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash({})", self.prefix())
    }
}

impl FromStr for SecureHash {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

/// A 32-byte Ed25519 public key.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(#[serde_as(as = "IfIsHumanReadable<Hex, Bytes>")] pub [u8; 32]);

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..4]))
    }
}

impl FromStr for PublicKey {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

/// A 64-byte Ed25519 signature.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureBytes(#[serde_as(as = "IfIsHumanReadable<Hex, Bytes>")] pub [u8; 64]);

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({}..)", hex::encode(&self.0[..4]))
    }
}

/// A well-known ledger identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    /// Human-readable legal name.
    pub name: String,
    /// Key the party signs with.
    pub owning_key: PublicKey,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// CLUSTER B: STATES
// =============================================================================

/// Pointer to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// Id of the transaction that produced the state.
    pub txhash: SecureHash,
    /// Output index within that transaction.
    pub index: u32,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

/// A ledger state governed by a named contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState {
    /// Name of the contract that constrains this state.
    pub contract: String,
    /// Current owner of the state.
    pub owner: Party,
    /// Quantity held by the state.
    pub amount: u64,
    /// Notary responsible for consuming this state.
    pub notary: Party,
}

/// A resolved input: the state together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state: TransactionState,
    pub reference: StateRef,
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// An instruction to a contract, with the keys that must sign it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Contract the command is addressed to.
    pub contract: String,
    /// Command name (e.g. `Issue`, `Move`).
    pub name: String,
    /// Keys that must have signed the transaction.
    pub signers: Vec<PublicKey>,
}

/// Validity window for a transaction (dates are inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// The signed-over content of a transaction, with inputs as references only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub inputs: Vec<StateRef>,
    pub outputs: Vec<TransactionState>,
    pub commands: Vec<Command>,
    pub notary: Option<Party>,
    pub time_window: Option<TimeWindow>,
}

impl WireTransaction {
    /// Compute the transaction id: SHA-256 over the canonical bincode encoding.
    #[must_use]
    pub fn id(&self) -> SecureHash {
        // Serializing plain data into a Vec cannot fail.
        let bytes = bincode::serialize(self).unwrap_or_default();
        SecureHash::sha256(&bytes)
    }
}

/// A signature by one key over a transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub by: PublicKey,
    pub bytes: SignatureBytes,
}

/// A wire transaction with its collected signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub wire: WireTransaction,
    pub signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    #[must_use]
    pub fn id(&self) -> SecureHash {
        self.wire.id()
    }
}

/// A transaction with every input dereferenced, ready for verification.
///
/// This is the unit of work shipped to verifiers. Its `id` is the claimed
/// id; verifiers recompute it from the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTransaction {
    pub id: SecureHash,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<TransactionState>,
    pub commands: Vec<Command>,
    pub notary: Option<Party>,
    pub time_window: Option<TimeWindow>,
    pub signatures: Vec<TransactionSignature>,
}

impl ResolvedTransaction {
    /// Rebuild the wire form this transaction was resolved from.
    #[must_use]
    pub fn to_wire(&self) -> WireTransaction {
        WireTransaction {
            inputs: self.inputs.iter().map(|i| i.reference).collect(),
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            notary: self.notary.clone(),
            time_window: self.time_window,
        }
    }

    /// Union of all command signers, deduplicated, in first-seen order.
    #[must_use]
    pub fn required_signers(&self) -> Vec<PublicKey> {
        let mut signers: Vec<PublicKey> = Vec::new();
        for key in self.commands.iter().flat_map(|c| c.signers.iter()) {
            if !signers.contains(key) {
                signers.push(*key);
            }
        }
        signers
    }
}
