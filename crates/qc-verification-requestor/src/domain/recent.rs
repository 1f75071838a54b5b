//! # Recent Completions
//!
//! Remembers recently completed correlation ids for a bounded time, so a
//! redelivered duplicate result can be told apart from a result nobody
//! asked for.
//!
//! - An id is remembered for `ttl` after its completion
//! - Expired ids are garbage-collected at most once per `gc_interval`

use shared_types::CorrelationId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Time-bounded set of completed correlation ids.
#[derive(Debug)]
pub struct RecentCompletions {
    /// Map of id -> when it completed.
    cache: HashMap<CorrelationId, Instant>,
    ttl: Duration,
    last_gc: Instant,
    gc_interval: Duration,
}

impl RecentCompletions {
    /// Default retention.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_TTL, Self::DEFAULT_GC_INTERVAL)
    }

    #[must_use]
    pub fn with_config(ttl: Duration, gc_interval: Duration) -> Self {
        Self {
            cache: HashMap::new(),
            ttl,
            last_gc: Instant::now(),
            gc_interval,
        }
    }

    /// Remember that `id` completed now.
    pub fn record(&mut self, id: CorrelationId) {
        let now = Instant::now();
        if now.duration_since(self.last_gc) > self.gc_interval {
            self.garbage_collect(now);
            self.last_gc = now;
        }
        self.cache.insert(id, now);
    }

    /// Whether `id` completed within the retention window.
    #[must_use]
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.cache
            .get(id)
            .is_some_and(|completed| completed.elapsed() <= self.ttl)
    }

    /// Drop every id older than the retention window.
    pub fn garbage_collect(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.cache
            .retain(|_, completed| now.duration_since(*completed) <= ttl);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for RecentCompletions {
    fn default() -> Self {
        Self::new()
    }
}
