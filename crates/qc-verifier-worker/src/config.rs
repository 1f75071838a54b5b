//! # Worker Configuration

use shared_bus::VERIFICATION_REQUESTS_QUEUE;

/// Settings for one verifier worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name used in logs.
    pub name: String,
    /// Queue the worker competes on.
    pub request_queue: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "verifier".to_string(),
            request_queue: VERIFICATION_REQUESTS_QUEUE.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Default settings under another name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
