use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_indexed: AtomicU64,
    empty_summaries: AtomicU64,
    searches_served: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingestion run and how many of its summaries came out empty.
    pub fn record_ingest(&self, documents: u64, empty_summaries: u64) {
        self.documents_indexed
            .fetch_add(documents, Ordering::Relaxed);
        self.empty_summaries
            .fetch_add(empty_summaries, Ordering::Relaxed);
    }

    /// Record a completed search.
    pub fn record_search(&self) {
        self.searches_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            empty_summaries: self.empty_summaries.load(Ordering::Relaxed),
            searches_served: self.searches_served.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents indexed since startup.
    pub documents_indexed: u64,
    /// Indexed documents whose summary was empty because no sentence fit the budget.
    pub empty_summaries: u64,
    /// Number of searches answered since startup.
    pub searches_served: u64,
}
