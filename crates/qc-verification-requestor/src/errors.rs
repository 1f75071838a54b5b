//! # Requestor Errors

use crate::ports::outbound::ResolutionError;
use shared_bus::BusError;
use shared_types::{CodecError, VerificationError};
use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of the verification requestor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestorError {
    /// A verifier examined the transaction and rejected it, or could not
    /// verify it at all (malformed job, verifier fault).
    #[error("Transaction verification failed: {0}")]
    Verification(VerificationError),

    /// The bus rejected an operation. Fatal to the requestor.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// A request could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transaction could not be resolved before dispatch.
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Fewer verifiers than required attached within the allowed time.
    #[error("Timed out after {waited:?} waiting for {required} verifiers ({attached} attached)")]
    VerifierTimeout {
        required: usize,
        attached: usize,
        waited: Duration,
    },

    /// The requestor was shut down, or its result listener stopped.
    #[error("Verification requestor closed")]
    Closed,

    /// The configuration cannot be used.
    #[error("Invalid requestor configuration: {0}")]
    InvalidConfig(String),
}

impl From<VerificationError> for RequestorError {
    fn from(err: VerificationError) -> Self {
        RequestorError::Verification(err)
    }
}

impl RequestorError {
    /// The verification failure detail, if this is one.
    #[must_use]
    pub fn verification_error(&self) -> Option<&VerificationError> {
        match self {
            RequestorError::Verification(err) => Some(err),
            _ => None,
        }
    }
}
