//! # Error Types
//!
//! Defines error types shared between the requestor and the verifier pool.

use crate::entities::{PublicKey, SecureHash, StateRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a transaction failed verification.
///
/// This is data: it crosses the bus inside a `VerificationOutcome::Failure`
/// and is never used to report transport problems.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationError {
    /// The claimed id does not match the hash of the content.
    #[error("Transaction id mismatch: claimed {claimed}, computed {computed}")]
    TransactionIdMismatch {
        claimed: SecureHash,
        computed: SecureHash,
    },

    /// A transaction must carry at least one command.
    #[error("Transaction {tx} has no commands")]
    MissingCommands { tx: SecureHash },

    /// The same input state is consumed twice.
    #[error("Transaction {tx} consumes input {input} more than once")]
    DuplicateInput { tx: SecureHash, input: StateRef },

    /// Inputs are consumed but no notary is named.
    #[error("Transaction {tx} consumes inputs but names no notary")]
    MissingNotary { tx: SecureHash },

    /// An input is controlled by a different notary than the transaction's.
    #[error("Input {input} is notarised by {found}, transaction expects {expected}")]
    NotaryMismatch {
        input: StateRef,
        expected: String,
        found: String,
    },

    /// The time window ends before it starts.
    #[error("Transaction {tx} has an empty time window")]
    InvalidTimeWindow { tx: SecureHash },

    /// A required signer did not sign.
    #[error("Transaction {tx} is missing a signature from {signer}")]
    MissingSignature { tx: SecureHash, signer: PublicKey },

    /// A signature does not verify against the transaction id.
    #[error("Invalid signature by {signer} on transaction {tx}")]
    InvalidSignature { tx: SecureHash, signer: PublicKey },

    /// A contract rejected the transaction.
    #[error("Contract {contract} rejected transaction {tx}: {reason}")]
    ContractRejection {
        tx: SecureHash,
        contract: String,
        reason: String,
    },

    /// The payload could not be decoded; retrying elsewhere would fail the same way.
    #[error("Malformed verification payload: {reason}")]
    MalformedPayload { reason: String },

    /// The verification function itself failed for a reason unrelated to
    /// the transaction (e.g. it panicked).
    #[error("Verifier fault: {reason}")]
    VerifierFault { reason: String },
}

/// Errors from encoding or decoding bus payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Serialization failed.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Deserialization failed.
    #[error("Decode failed: {0}")]
    Decode(String),
}

impl From<CodecError> for VerificationError {
    fn from(err: CodecError) -> Self {
        VerificationError::MalformedPayload {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_becomes_malformed_payload() {
        let err: VerificationError = CodecError::Decode("eof".into()).into();
        assert_eq!(
            err,
            VerificationError::MalformedPayload {
                reason: "Decode failed: eof".into()
            }
        );
    }

    #[test]
    fn test_error_display() {
        let err = VerificationError::MissingCommands {
            tx: SecureHash::ZERO,
        };
        assert!(err.to_string().contains("has no commands"));
    }
}
