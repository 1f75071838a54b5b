//! # Result Listener
//!
//! Background task draining a requestor's private response queue into the
//! pending store.
//!
//! Each result completes its pending entry first and is acknowledged after,
//! so a crash in between at worst causes a duplicate that the store
//! recognises and discards.

use crate::domain::pending::PendingVerificationStore;
use shared_bus::{BusError, QueueConsumer};
use shared_types::{BusMessage, CorrelationId, VerificationError, VerificationOutcome, VerificationResult};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Extract the correlation id and outcome from a response envelope.
///
/// The envelope's correlation id is authoritative: a result that cannot be
/// decoded, or whose payload disagrees with its envelope, still completes
/// the entry the envelope names, with a `MalformedPayload` failure.
pub fn decode_result(message: &BusMessage) -> (CorrelationId, VerificationOutcome) {
    let id = message.correlation_id;
    let malformed = |reason: String| {
        (
            id,
            VerificationOutcome::Failure(VerificationError::MalformedPayload { reason }),
        )
    };

    if !message.is_supported_version() {
        return malformed(format!("unsupported envelope version {}", message.version));
    }

    match message.format.decode::<VerificationResult>(&message.payload) {
        Ok(result) if result.correlation_id == id => (id, result.outcome),
        Ok(result) => malformed(format!(
            "correlation id mismatch: envelope {id}, payload {}",
            result.correlation_id
        )),
        Err(e) => malformed(e.to_string()),
    }
}

/// Drain results until the bus closes or fails.
///
/// When the loop ends, every still-pending handle resolves to `Closed`.
pub(crate) async fn run_listener<C: QueueConsumer>(
    mut consumer: C,
    store: Arc<PendingVerificationStore>,
    requestor: String,
) {
    info!(
        requestor = %requestor,
        queue = %consumer.queue(),
        "Result listener started"
    );

    loop {
        let delivery = match consumer.consume().await {
            Ok(delivery) => delivery,
            Err(BusError::Closed) => {
                info!(requestor = %requestor, "Bus closed, result listener stopping");
                break;
            }
            Err(e) => {
                error!(requestor = %requestor, error = %e, "Result listener failed");
                break;
            }
        };

        let (correlation_id, outcome) = decode_result(delivery.message());
        store.complete(correlation_id, outcome);

        if let Err(e) = delivery.ack() {
            warn!(
                requestor = %requestor,
                correlation_id = %correlation_id,
                error = %e,
                "Could not acknowledge result"
            );
        }
    }

    store.close_all();
}
