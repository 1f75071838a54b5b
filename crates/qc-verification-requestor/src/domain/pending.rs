//! Pending Verification Store - the requestor's correlation table.
//!
//! Maps correlation ids to the completion of callers awaiting a verifier's
//! answer. An entry is inserted before its request is sent and removed in
//! the same step that completes it, so each id completes at most once.

use crate::domain::handle::VerificationHandle;
use crate::domain::recent::RecentCompletions;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{CorrelationId, VerificationOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tracing::{debug, warn};

/// A verification waiting for its result
struct PendingEntry {
    /// Channel to deliver the outcome
    sender: oneshot::Sender<VerificationOutcome>,
    /// When the request was registered
    created_at: Instant,
    /// In-flight slot, released when the entry is removed
    _permit: Option<OwnedSemaphorePermit>,
}

/// Statistics for the pending store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total verifications registered
    pub total_registered: AtomicU64,
    /// Total verifications completed with a waiting caller
    pub total_completed: AtomicU64,
    /// Results that arrived after every handle was dropped
    pub total_abandoned: AtomicU64,
    /// Results for ids that had already completed (redelivered duplicates)
    pub total_duplicates: AtomicU64,
    /// Results for ids this requestor never issued or long forgot
    pub total_unknown: AtomicU64,
    /// Registrations withdrawn because the request could not be sent
    pub total_cancelled: AtomicU64,
}

/// What happened to a result handed to [`PendingVerificationStore::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A waiting caller received the outcome.
    Delivered,
    /// The entry was pending but nobody is waiting any more.
    Abandoned,
    /// The id already completed recently; this is a duplicate.
    Duplicate,
    /// The id is not pending and was not recently completed.
    Unknown,
}

/// Correlation table for in-flight verifications.
///
/// Flow:
/// 1. Submit path calls `register()` and gets an id plus a handle
/// 2. Submit path sends the request carrying the id
/// 3. Result listener calls `complete()` with the verifier's outcome
/// 4. Caller awaits the handle
pub struct PendingVerificationStore {
    /// Map of correlation ID to pending entry
    pending: DashMap<CorrelationId, PendingEntry>,
    /// Ids completed recently, for duplicate detection
    recent: Mutex<RecentCompletions>,
    /// Statistics
    stats: PendingStats,
}

impl PendingVerificationStore {
    /// Create a store remembering completed ids for `recent_ttl`.
    #[must_use]
    pub fn new(recent_ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            recent: Mutex::new(RecentCompletions::with_config(
                recent_ttl,
                RecentCompletions::DEFAULT_GC_INTERVAL,
            )),
            stats: PendingStats::default(),
        }
    }

    /// Register a new verification under a fresh correlation id.
    ///
    /// `permit`, if given, is held until the entry is removed.
    pub fn register(
        &self,
        permit: Option<OwnedSemaphorePermit>,
    ) -> (CorrelationId, VerificationHandle) {
        let correlation_id = CorrelationId::new();
        let (sender, receiver) = oneshot::channel();

        self.pending.insert(
            correlation_id,
            PendingEntry {
                sender,
                created_at: Instant::now(),
                _permit: permit,
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(correlation_id = %correlation_id, "Registered pending verification");

        (correlation_id, VerificationHandle::new(correlation_id, receiver))
    }

    /// Complete a pending verification with its outcome.
    ///
    /// Removal and completion happen together: of any number of results
    /// carrying the same id, only the first finds the entry.
    pub fn complete(&self, correlation_id: CorrelationId, outcome: VerificationOutcome) -> Completion {
        let Some((_, entry)) = self.pending.remove(&correlation_id) else {
            return self.classify_missing(correlation_id);
        };

        self.recent.lock().record(correlation_id);
        let response_time = entry.created_at.elapsed();
        let success = outcome.is_success();

        // Counted before the send can wake the caller.
        self.stats.total_completed.fetch_add(1, Ordering::SeqCst);
        match entry.sender.send(outcome) {
            Ok(()) => {
                debug!(
                    correlation_id = %correlation_id,
                    success = success,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending verification"
                );
                Completion::Delivered
            }
            Err(_) => {
                // Every handle was dropped
                self.stats.total_completed.fetch_sub(1, Ordering::SeqCst);
                self.stats.total_abandoned.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    "Verification result arrived after caller gave up"
                );
                Completion::Abandoned
            }
        }
    }

    fn classify_missing(&self, correlation_id: CorrelationId) -> Completion {
        if self.recent.lock().contains(&correlation_id) {
            self.stats.total_duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Discarding duplicate verification result");
            Completion::Duplicate
        } else {
            self.stats.total_unknown.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                "Verification result for unknown correlation ID"
            );
            Completion::Unknown
        }
    }

    /// Withdraw a registration whose request never made it onto the bus.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop every pending entry. Their handles resolve to `Closed`.
    ///
    /// Returns the number of entries dropped.
    pub fn close_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        if count > 0 {
            warn!(dropped = count, "Closed pending verifications without results");
        }
        count
    }

    /// Get number of verifications still awaiting a result
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingVerificationStore {
    fn default() -> Self {
        Self::new(RecentCompletions::DEFAULT_TTL)
    }
}
