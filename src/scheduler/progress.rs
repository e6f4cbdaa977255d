//! Background progress monitor for long-running batches.
//!
//! Periodically logs batch counters (completed, succeeded, failed) so
//! operators can track a run without parsing individual per-case log lines.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use super::outcome::AnalysisOutcome;

/// Shared atomic counters incremented by scheduler workers.
///
/// Cloned into worker tasks; the background monitor reads them periodically.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounters {
    completed: Arc<AtomicUsize>,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl ProgressCounters {
    /// Create a new set of zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal outcome.
    pub fn record(&self, outcome: &AnalysisOutcome) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records with a terminal outcome so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Records that succeeded so far.
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Records that failed so far.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// A background task that periodically logs batch progress.
///
/// Spawns a tokio task that wakes every `interval` and logs a summary of
/// the counters. Call [`ProgressMonitor::stop`] to cancel.
pub struct ProgressMonitor {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Start a monitor that logs every `interval` until stopped.
    pub fn start(counters: ProgressCounters, total: usize, interval: Duration) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        let start = Instant::now();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // skip the immediate first tick

            loop {
                tick.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }

                let completed = counters.completed();
                let pct = if total > 0 {
                    (completed as f64 / total as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };

                tracing::info!(
                    completed,
                    succeeded = counters.succeeded(),
                    failed = counters.failed(),
                    total,
                    progress_pct = format!("{:.1}%", pct),
                    elapsed_secs = start.elapsed().as_secs(),
                    "Batch progress"
                );
            }
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Signal the background monitor to stop and wait for it to finish.
    pub async fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CaseRecord;
    use crate::scheduler::AnalysisOutcome;
    use crate::error::AnalysisError;

    fn sample_record() -> CaseRecord {
        CaseRecord {
            index: 0,
            age: 60,
            sex: "M".to_string(),
            chief_complaint: String::new(),
            present_history: String::new(),
            past_history: String::new(),
            surgery_day: String::new(),
            cta_report: String::new(),
        }
    }

    #[test]
    fn test_counters_start_at_zero() {
        let counters = ProgressCounters::new();
        assert_eq!(counters.completed(), 0);
        assert_eq!(counters.succeeded(), 0);
        assert_eq!(counters.failed(), 0);
    }

    #[test]
    fn test_counters_record_outcomes() {
        let counters = ProgressCounters::new();
        let record = sample_record();

        counters.record(&AnalysisOutcome::success(&record, "out".to_string(), 1));
        counters.record(&AnalysisOutcome::failure(
            &record,
            3,
            &AnalysisError::EmptyResponse,
        ));

        assert_eq!(counters.completed(), 2);
        assert_eq!(counters.succeeded(), 1);
        assert_eq!(counters.failed(), 1);
    }

    #[test]
    fn test_counters_clone_shares_state() {
        let counters = ProgressCounters::new();
        let clone = counters.clone();

        counters.record(&AnalysisOutcome::success(
            &sample_record(),
            "out".to_string(),
            1,
        ));
        assert_eq!(clone.completed(), 1);
    }

    #[tokio::test]
    async fn test_monitor_start_stop() {
        let counters = ProgressCounters::new();
        counters.record(&AnalysisOutcome::success(
            &sample_record(),
            "out".to_string(),
            1,
        ));

        let monitor = ProgressMonitor::start(counters, 10, Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(60)).await;
        monitor.stop().await;
    }
}
