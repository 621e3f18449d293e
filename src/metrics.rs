// Performance metrics module
//
// Lightweight counters for monitoring poll health and mutation volume.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Engine metrics
///
/// Uses atomic operations for thread-safe tracking without locks. Counters
/// are bumped by the engine throughout its lifetime and can be logged
/// periodically or on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Full process/profile passes that produced a fresh view
    pub full_passes: AtomicU64,

    /// Full passes that failed and were answered from the cached view
    pub fallback_passes: AtomicU64,

    /// Full passes that failed with nothing cached to serve
    pub failed_passes: AtomicU64,

    /// Focus polls completed
    pub focus_polls: AtomicU64,

    /// Focus polls that failed
    pub focus_failures: AtomicU64,

    /// Store mutations applied (create, toggle, reload)
    pub mutations: AtomicU64,

    /// Store mutations rejected or failed
    pub mutation_failures: AtomicU64,

    /// OS or driver calls that exceeded their deadline
    pub timeouts: AtomicU64,

    /// Engine start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            full_passes: AtomicU64::new(0),
            fallback_passes: AtomicU64::new(0),
            failed_passes: AtomicU64::new(0),
            focus_polls: AtomicU64::new(0),
            focus_failures: AtomicU64::new(0),
            mutations: AtomicU64::new(0),
            mutation_failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_full_pass(&self) {
        self.full_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_pass(&self) {
        self.fallback_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_pass(&self) {
        self.failed_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_focus_poll(&self) {
        self.focus_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_focus_failure(&self) {
        self.focus_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mutation_failure(&self) {
        self.mutation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Log a one-line summary of all counters at info level.
    pub fn log_summary(&self) {
        let uptime = self.start_time.elapsed();
        tracing::info!(
            "Metrics: uptime={:?}, full_passes={}, fallback={}, failed={}, focus_polls={}, focus_failures={}, mutations={}, mutation_failures={}, timeouts={}",
            uptime,
            self.full_passes.load(Ordering::Relaxed),
            self.fallback_passes.load(Ordering::Relaxed),
            self.failed_passes.load(Ordering::Relaxed),
            self.focus_polls.load(Ordering::Relaxed),
            self.focus_failures.load(Ordering::Relaxed),
            self.mutations.load(Ordering::Relaxed),
            self.mutation_failures.load(Ordering::Relaxed),
            self.timeouts.load(Ordering::Relaxed),
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
