//! # Ed25519 Transaction Signatures
//!
//! Pure domain logic for checking that every required signer signed the
//! transaction id.
//!
//! ## Notes
//!
//! - Signatures are over the 32 raw bytes of the transaction id
//! - Uses `verify_strict` (rejects small-order keys and malleable encodings)
//! - Provided signatures are checked in parallel; the reported failure is the
//!   first one in signature order, so the outcome never depends on scheduling

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rayon::prelude::*;
use shared_types::{
    PublicKey, ResolvedTransaction, SecureHash, SignatureBytes, TransactionSignature,
    VerificationError,
};

/// Sign a transaction id.
#[must_use]
pub fn sign(key: &SigningKey, id: &SecureHash) -> TransactionSignature {
    let signature = key.sign(id.as_bytes());
    TransactionSignature {
        by: public_key(key),
        bytes: SignatureBytes(signature.to_bytes()),
    }
}

/// The ledger public key for a signing key.
#[must_use]
pub fn public_key(key: &SigningKey) -> PublicKey {
    PublicKey(key.verifying_key().to_bytes())
}

/// Check a single signature over `id`.
#[must_use]
pub fn is_valid(id: &SecureHash, signature: &TransactionSignature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(&signature.by.0) else {
        return false;
    };
    let sig = Signature::from_bytes(&signature.bytes.0);
    key.verify_strict(id.as_bytes(), &sig).is_ok()
}

/// Verify that all provided signatures are valid and that every required
/// signer is among them.
///
/// # Errors
///
/// - `InvalidSignature` - A provided signature does not verify
/// - `MissingSignature` - A required signer has no signature
pub fn verify_signatures(tx: &ResolvedTransaction) -> Result<(), VerificationError> {
    let checks: Vec<bool> = tx
        .signatures
        .par_iter()
        .map(|s| is_valid(&tx.id, s))
        .collect();

    if let Some((signature, _)) = tx
        .signatures
        .iter()
        .zip(&checks)
        .find(|(_, valid)| !**valid)
    {
        return Err(VerificationError::InvalidSignature {
            tx: tx.id,
            signer: signature.by,
        });
    }

    for signer in tx.required_signers() {
        if !tx.signatures.iter().any(|s| s.by == signer) {
            return Err(VerificationError::MissingSignature { tx: tx.id, signer });
        }
    }

    Ok(())
}
