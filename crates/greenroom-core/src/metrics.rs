//! Global atomic counters for swarm observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a production round).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    messages_delivered: AtomicU64,
    votes_cast: AtomicU64,
    votes_rejected: AtomicU64,
    tasks_assigned: AtomicU64,
    tasks_finished: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            messages_delivered: AtomicU64::new(0),
            votes_cast: AtomicU64::new(0),
            votes_rejected: AtomicU64::new(0),
            tasks_assigned: AtomicU64::new(0),
            tasks_finished: AtomicU64::new(0),
        }
    }

    /// Add to the messages-delivered counter (one send can deliver many).
    pub fn add_messages_delivered(&self, n: u64) {
        self.messages_delivered.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment the votes-cast counter by one.
    pub fn inc_votes_cast(&self) {
        self.votes_cast.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the votes-rejected counter by one.
    pub fn inc_votes_rejected(&self) {
        self.votes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the tasks-assigned counter by one.
    pub fn inc_tasks_assigned(&self) {
        self.tasks_assigned.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the tasks-finished counter by one.
    pub fn inc_tasks_finished(&self) {
        self.tasks_finished.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a round, daemon tick)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            messages_delivered = self.messages_delivered(),
            votes_cast = self.votes_cast(),
            votes_rejected = self.votes_rejected(),
            tasks_assigned = self.tasks_assigned(),
            tasks_finished = self.tasks_finished(),
        );
    }

    /// Read the current messages-delivered count.
    pub fn messages_delivered(&self) -> u64 {
        self.messages_delivered.load(Ordering::Relaxed)
    }

    /// Read the current votes-cast count.
    pub fn votes_cast(&self) -> u64 {
        self.votes_cast.load(Ordering::Relaxed)
    }

    /// Read the current votes-rejected count.
    pub fn votes_rejected(&self) -> u64 {
        self.votes_rejected.load(Ordering::Relaxed)
    }

    /// Read the current tasks-assigned count.
    pub fn tasks_assigned(&self) -> u64 {
        self.tasks_assigned.load(Ordering::Relaxed)
    }

    /// Read the current tasks-finished count.
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_finished.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.messages_delivered.store(0, Ordering::Relaxed);
        self.votes_cast.store(0, Ordering::Relaxed);
        self.votes_rejected.store(0, Ordering::Relaxed);
        self.tasks_assigned.store(0, Ordering::Relaxed);
        self.tasks_finished.store(0, Ordering::Relaxed);
    }
}
