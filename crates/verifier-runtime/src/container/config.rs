//! # Cluster Configuration
//!
//! Defaults suit a local demo; every field can be overridden from `QC_*`
//! environment variables. Unparseable values are logged and ignored.

use qc_verification_requestor::RequestorConfig;
use qc_verifier_worker::WorkerConfig;
use shared_types::WireFormat;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A queue name is blank.
    #[error("Queue name for {0} must not be empty")]
    EmptyQueue(&'static str),

    /// The requestor and the workers would not meet on the same queue.
    #[error("Requestor sends to {requestor} but verifiers consume {worker}")]
    QueueMismatch { requestor: String, worker: String },

    /// The in-flight bound would block every submission.
    #[error("QC_MAX_IN_FLIGHT must be at least 1")]
    ZeroInFlight,

    /// Waiting for verifiers needs a non-zero timeout when verifiers are expected.
    #[error("QC_VERIFIER_WAIT_SECS must be positive when verifiers are started")]
    ZeroVerifierWait,
}

/// Complete cluster configuration.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Requestor settings.
    pub requestor: RequestorConfig,
    /// Settings shared by every verifier worker.
    pub worker: WorkerConfig,
    /// Verifiers to start.
    pub verifiers: usize,
    /// How long to wait for the verifiers to attach.
    pub verifier_wait: Duration,
    /// Transactions the demo generates and verifies.
    pub demo_transactions: usize,
    /// Seed for the ledger generator.
    pub ledger_seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            requestor: RequestorConfig::named("node"),
            worker: WorkerConfig::default(),
            verifiers: 3,
            verifier_wait: Duration::from_secs(10),
            demo_transactions: 100,
            ledger_seed: 42,
        }
    }
}

impl ClusterConfig {
    /// Load defaults, then apply environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load defaults, then apply overrides from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        override_parsed(&lookup, "QC_VERIFIERS", &mut config.verifiers);
        override_parsed(&lookup, "QC_DEMO_TRANSACTIONS", &mut config.demo_transactions);
        override_parsed(&lookup, "QC_LEDGER_SEED", &mut config.ledger_seed);
        override_parsed(&lookup, "QC_WIRE_FORMAT", &mut config.requestor.wire_format);

        let mut wait_secs = config.verifier_wait.as_secs();
        override_parsed(&lookup, "QC_VERIFIER_WAIT_SECS", &mut wait_secs);
        config.verifier_wait = Duration::from_secs(wait_secs);

        if let Some(raw) = lookup("QC_MAX_IN_FLIGHT") {
            match raw.parse::<usize>() {
                Ok(n) => {
                    config.requestor.max_in_flight = Some(n);
                    info!(max_in_flight = n, "Loaded QC_MAX_IN_FLIGHT from environment");
                }
                Err(_) => warn!(value = %raw, "Ignoring unparseable QC_MAX_IN_FLIGHT"),
            }
        }

        if let Some(name) = lookup("QC_REQUESTOR_NAME") {
            if name.trim().is_empty() {
                warn!("Ignoring empty QC_REQUESTOR_NAME");
            } else {
                config.requestor.name = name;
            }
        }

        config
    }

    /// Reject settings that cannot work.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requestor.request_queue.trim().is_empty() {
            return Err(ConfigError::EmptyQueue("requests"));
        }
        if self.requestor.response_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyQueue("responses"));
        }
        if self.requestor.request_queue != self.worker.request_queue {
            return Err(ConfigError::QueueMismatch {
                requestor: self.requestor.request_queue.clone(),
                worker: self.worker.request_queue.clone(),
            });
        }
        if self.requestor.max_in_flight == Some(0) {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.verifiers > 0 && self.verifier_wait.is_zero() {
            return Err(ConfigError::ZeroVerifierWait);
        }
        Ok(())
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.parse() {
        Ok(value) => {
            *target = value;
            info!(variable = name, value = %raw, "Loaded override from environment");
        }
        Err(_) => warn!(variable = name, value = %raw, "Ignoring unparseable override"),
    }
}
