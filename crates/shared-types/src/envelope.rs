//! # `BusMessage` Envelope
//!
//! The wrapper for every message placed on a queue.
//!
//! ## Properties
//!
//! - **Versioning**: All messages include a `version` field for forward compatibility.
//! - **Correlation**: Request/response flows use `correlation_id` and `reply_to`.
//! - **Self-describing payload**: `format` names the codec used for `payload`,
//!   so a verifier answers in the format the requestor speaks.

use crate::codec::WireFormat;
use crate::ipc::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// The message envelope for all queue traffic.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    // =========================================================================
    // HEADER SECTION
    // =========================================================================
    /// Protocol version for forward compatibility.
    /// MUST be checked by receivers before decoding the payload.
    pub version: u16,

    /// Unique id of this message (distinct per send, stable across redelivery).
    pub message_id: Uuid,

    /// For requests: a fresh id from the requestor.
    /// For responses: the id from the original request.
    pub correlation_id: CorrelationId,

    /// Queue the response must be sent to.
    /// MUST be present on verification requests.
    pub reply_to: Option<String>,

    /// Unix timestamp (seconds since epoch) when the message was created.
    pub timestamp: u64,

    /// Codec used for `payload`.
    pub format: WireFormat,

    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Current protocol version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Build a request that expects an answer on `reply_to`.
    #[must_use]
    pub fn request(
        correlation_id: CorrelationId,
        reply_to: impl Into<String>,
        format: WireFormat,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            reply_to: Some(reply_to.into()),
            ..Self::new(correlation_id, format, payload)
        }
    }

    /// Build a response to the request carrying `correlation_id`.
    #[must_use]
    pub fn response(correlation_id: CorrelationId, format: WireFormat, payload: Vec<u8>) -> Self {
        Self::new(correlation_id, format, payload)
    }

    fn new(correlation_id: CorrelationId, format: WireFormat, payload: Vec<u8>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            message_id: Uuid::new_v4(),
            correlation_id,
            reply_to: None,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            format,
            payload,
        }
    }

    /// Whether this receiver understands the envelope version.
    #[must_use]
    pub fn is_supported_version(&self) -> bool {
        self.version == Self::CURRENT_VERSION
    }
}
