//! # Completion Handle
//!
//! The caller's view of one submitted verification.

use crate::errors::RequestorError;
use futures::future::{FutureExt, Shared};
use shared_types::{CorrelationId, VerificationOutcome};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type OutcomeReceiver = Shared<oneshot::Receiver<VerificationOutcome>>;

/// Resolves once the verification result arrives.
///
/// Cloning gives another waiter on the same completion; every clone sees
/// the same outcome. Dropping every clone abandons interest in the result
/// but does not cancel the in-flight job.
///
/// Resolves to:
/// - `Ok(())` - The transaction verified
/// - `Err(RequestorError::Verification(_))` - It did not, with the reason
/// - `Err(RequestorError::Closed)` - The requestor stopped before an answer arrived
#[derive(Clone)]
#[must_use = "a verification handle does nothing unless awaited"]
pub struct VerificationHandle {
    correlation_id: CorrelationId,
    receiver: OutcomeReceiver,
}

impl VerificationHandle {
    pub(crate) fn new(
        correlation_id: CorrelationId,
        receiver: oneshot::Receiver<VerificationOutcome>,
    ) -> Self {
        Self {
            correlation_id,
            receiver: receiver.shared(),
        }
    }

    /// Id the request was dispatched under.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// The outcome, if it has already been observed by some waiter.
    pub fn peek(&self) -> Option<Result<(), RequestorError>> {
        self.receiver.peek().map(|received| to_result(received.clone()))
    }
}

fn to_result(
    received: Result<VerificationOutcome, oneshot::error::RecvError>,
) -> Result<(), RequestorError> {
    match received {
        Ok(outcome) => outcome.into_result().map_err(RequestorError::Verification),
        Err(_) => Err(RequestorError::Closed),
    }
}

impl Future for VerificationHandle {
    type Output = Result<(), RequestorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(to_result)
    }
}

impl std::fmt::Debug for VerificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationHandle")
            .field("correlation_id", &self.correlation_id)
            .field("completed", &self.receiver.peek().is_some())
            .finish()
    }
}
