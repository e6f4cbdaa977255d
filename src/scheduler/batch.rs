//! Semaphore-bounded fan-out of case records to analysis workers.
//!
//! One spawned task per record, gated by a semaphore sized to the
//! concurrency limit, which is the pipeline's only admission-control knob on
//! outbound analysis calls. Workers send terminal outcomes over an mpsc
//! channel to a single collector loop, the only writer over the accumulating
//! [`ResultSet`].

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tracing::{info, warn};

use super::outcome::AnalysisOutcome;
use super::progress::ProgressCounters;
use super::retry::RetryPolicy;
use crate::llm::AnalysisClient;
use crate::records::CaseRecord;
use crate::store::ResultSet;

/// Default number of concurrent analysis workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fans records out to a bounded pool of workers and collects exactly one
/// outcome per record.
pub struct BatchScheduler {
    client: Arc<dyn AnalysisClient>,
    retry: RetryPolicy,
    concurrency: usize,
    counters: ProgressCounters,
}

impl BatchScheduler {
    /// Create a scheduler. `concurrency` is clamped to at least one worker.
    pub fn new(client: Arc<dyn AnalysisClient>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            client,
            retry,
            concurrency: concurrency.max(1),
            counters: ProgressCounters::new(),
        }
    }

    /// Shared progress counters, for wiring up a progress monitor.
    pub fn counters(&self) -> ProgressCounters {
        self.counters.clone()
    }

    /// Process the whole batch.
    ///
    /// Every record yields exactly one outcome unless the run is cancelled
    /// through `shutdown`, in which case in-flight workers are aborted and
    /// the partial set collected so far is returned. Completion order is
    /// unspecified; the returned set iterates sorted by index.
    pub async fn run(
        &self,
        records: Vec<CaseRecord>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ResultSet {
        let total = records.len();
        let mut results = ResultSet::new();
        if total == 0 {
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<AnalysisOutcome>(total);

        let mut handles = Vec::with_capacity(total);
        for record in records {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let retry = self.retry.clone();
            let counters = self.counters.clone();
            let outcome_tx = outcome_tx.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let outcome = retry.execute(client.as_ref(), &record).await;
                counters.record(&outcome);

                if outcome.is_success() {
                    info!(
                        index = outcome.index,
                        attempts = outcome.attempt_count,
                        "Case analyzed"
                    );
                } else {
                    warn!(
                        index = outcome.index,
                        attempts = outcome.attempt_count,
                        error = outcome.last_error.as_deref().unwrap_or("unknown"),
                        "Case failed"
                    );
                }

                // The receiver only disappears when the run is cancelled; a
                // send error just discards the outcome with the run.
                let _ = outcome_tx.send(outcome).await;
            }));
        }
        drop(outcome_tx);

        let mut shutdown_closed = false;
        loop {
            tokio::select! {
                received = outcome_rx.recv() => match received {
                    Some(outcome) => {
                        results.insert(outcome);
                        if results.len() == total {
                            break;
                        }
                    }
                    None => break,
                },
                signal = shutdown.recv(), if !shutdown_closed => match signal {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        warn!(
                            completed = results.len(),
                            total,
                            "Cancellation requested; aborting in-flight analysis"
                        );
                        for handle in &handles {
                            handle.abort();
                        }
                        while let Ok(outcome) = outcome_rx.try_recv() {
                            results.insert(outcome);
                        }
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // No cancellation source remains; stop polling it.
                        shutdown_closed = true;
                    }
                },
            }
        }

        results
    }
}
