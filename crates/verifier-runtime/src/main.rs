//! # Verifier Runtime Demo
//!
//! Starts a requestor and a verifier pool on an in-memory bus, verifies a
//! generated ledger, and prints a summary.
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`RUST_LOG` overrides the `info` default)
//! 2. Load configuration from `QC_*` environment variables
//! 3. Validate it
//! 4. Run the demo

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use verifier_runtime::{run_demo, ClusterConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClusterConfig::from_env();
    config.validate().context("Invalid configuration")?;
    info!(
        verifiers = config.verifiers,
        transactions = config.demo_transactions,
        format = %config.requestor.wire_format,
        "Starting verifier runtime"
    );

    let report = run_demo(&config).await?;
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        redelivered = report.redelivered,
        elapsed_ms = report.elapsed.as_millis(),
        "Verified {} transactions on {} verifiers",
        report.submitted,
        report.verifiers
    );
    Ok(())
}
