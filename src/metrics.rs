use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing catalog traffic.
#[derive(Default)]
pub struct CatalogMetrics {
    reads: AtomicU64,
    mutations: AtomicU64,
    counter_increments: AtomicU64,
    failures: AtomicU64,
}

impl CatalogMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed read against the hosted service.
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed create, edit, visibility change, or delete.
    pub fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a copy or download counter bump.
    pub fn record_increment(&self) {
        self.counter_increments.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed call to the hosted service.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            mutations: self.mutations.load(Ordering::Relaxed),
            counter_increments: self.counter_increments.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of catalog counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Reads served since startup.
    pub reads: u64,
    /// Successful mutations since startup.
    pub mutations: u64,
    /// Copy/download counter bumps since startup.
    pub counter_increments: u64,
    /// Failed hosted-service calls since startup.
    pub failures: u64,
}
