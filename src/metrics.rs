use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload and summarization activity.
#[derive(Default)]
pub struct CodeMetrics {
    documents_uploaded: AtomicU64,
    summaries_completed: AtomicU64,
    summaries_failed: AtomicU64,
    remote_attempts: AtomicU64,
}

impl CodeMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored upload.
    pub fn record_upload(&self) {
        self.documents_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one outbound call to the summarization engine.
    pub fn record_attempt(&self) {
        self.remote_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summarize run that ended in `completed`.
    pub fn record_completed(&self) {
        self.summaries_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summarize run that ended in `failed`.
    pub fn record_failed(&self) {
        self.summaries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_uploaded: self.documents_uploaded.load(Ordering::Relaxed),
            summaries_completed: self.summaries_completed.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
            remote_attempts: self.remote_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of PDFs accepted since startup.
    pub documents_uploaded: u64,
    /// Summarize runs that produced a summary.
    pub summaries_completed: u64,
    /// Summarize runs that ended in a failed state.
    pub summaries_failed: u64,
    /// Outbound calls made to the summarization engine.
    pub remote_attempts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_attempts_and_outcomes() {
        let metrics = CodeMetrics::new();
        metrics.record_upload();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_completed();
        metrics.record_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_uploaded, 1);
        assert_eq!(snapshot.remote_attempts, 2);
        assert_eq!(snapshot.summaries_completed, 1);
        assert_eq!(snapshot.summaries_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = CodeMetrics::new().snapshot();
        assert_eq!(snapshot.documents_uploaded, 0);
        assert_eq!(snapshot.remote_attempts, 0);
    }
}
