//! Concurrent batch scheduling for case analysis.
//!
//! - `batch`: semaphore-bounded fan-out of records to analysis workers
//! - `retry`: bounded retry with exponential backoff around each call
//! - `outcome`: terminal per-record result types
//! - `progress`: background progress logging for long runs

pub mod batch;
pub mod outcome;
pub mod progress;
pub mod retry;

pub use batch::BatchScheduler;
pub use outcome::{AnalysisOutcome, OutcomeStatus};
pub use progress::{ProgressCounters, ProgressMonitor};
pub use retry::{AttemptState, RetryPolicy};
