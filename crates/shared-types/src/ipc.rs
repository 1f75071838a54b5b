//! # IPC Message Payloads
//!
//! Payloads exchanged between a requestor and the verifier pool.
//!
//! ## Design Rules
//!
//! - Every payload travels inside a [`BusMessage`](crate::envelope::BusMessage).
//! - Request/response pairs are matched by [`CorrelationId`], which is also
//!   copied onto the envelope so a malformed payload can still be answered.

use crate::entities::ResolvedTransaction;
use crate::errors::VerificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CORRELATION
// =============================================================================

/// Correlation ID linking a verification request to its result.
///
/// Uses UUID v7, which is time-ordered and unique for the lifetime of the
/// process, so a stale result can never match a newer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Timestamp encoded in the id (milliseconds since Unix epoch).
    #[must_use]
    pub fn timestamp_ms(&self) -> Option<u64> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        Some(secs * 1000 + u64::from(nanos) / 1_000_000)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// =============================================================================
// VERIFICATION REQUEST / RESULT
// =============================================================================

/// A job for the verifier pool.
/// Sender: Requestor | Receiver: any attached Verifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Correlation ID of the pending entry awaiting this job.
    pub correlation_id: CorrelationId,
    /// The fully resolved transaction to verify.
    pub transaction: ResolvedTransaction,
}

/// Outcome of verifying one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    /// The transaction is valid.
    Success,
    /// The transaction is invalid, or could not be verified deterministically.
    Failure(VerificationError),
}

impl VerificationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success)
    }

    /// Convert into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<(), VerificationError> {
        match self {
            VerificationOutcome::Success => Ok(()),
            VerificationOutcome::Failure(err) => Err(err),
        }
    }
}

impl From<Result<(), VerificationError>> for VerificationOutcome {
    fn from(result: Result<(), VerificationError>) -> Self {
        match result {
            Ok(()) => VerificationOutcome::Success,
            Err(err) => VerificationOutcome::Failure(err),
        }
    }
}

/// The answer to a [`VerificationRequest`].
/// Sender: Verifier | Receiver: the requestor named in `reply_to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub correlation_id: CorrelationId,
    pub outcome: VerificationOutcome,
}
