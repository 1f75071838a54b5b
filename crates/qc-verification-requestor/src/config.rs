//! # Requestor Configuration

use shared_bus::{VERIFICATION_REQUESTS_QUEUE, VERIFICATION_RESPONSES_PREFIX};
use shared_types::WireFormat;
use std::time::Duration;

/// Settings for a verification requestor.
#[derive(Debug, Clone)]
pub struct RequestorConfig {
    /// Name of this requestor; part of its response queue name.
    pub name: String,
    /// Shared queue that verifiers compete on.
    pub request_queue: String,
    /// Prefix for this requestor's private response queue.
    pub response_prefix: String,
    /// Encoding used for request payloads.
    pub wire_format: WireFormat,
    /// Maximum number of unanswered requests; `None` for no bound.
    pub max_in_flight: Option<usize>,
    /// How long a completed id is remembered to recognise duplicate results.
    pub recent_ttl: Duration,
}

impl Default for RequestorConfig {
    fn default() -> Self {
        Self {
            name: "requestor".to_string(),
            request_queue: VERIFICATION_REQUESTS_QUEUE.to_string(),
            response_prefix: VERIFICATION_RESPONSES_PREFIX.to_string(),
            wire_format: WireFormat::default(),
            max_in_flight: None,
            recent_ttl: Duration::from_secs(120),
        }
    }
}

impl RequestorConfig {
    /// Default settings under another name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
