//! Terminal result types for analyzed case records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::records::CaseRecord;

/// Status of a terminal analysis outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// The analysis call produced output.
    Success,
    /// The retry budget was exhausted or a permanent failure occurred.
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "success"),
            OutcomeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal result of analyzing one case record.
///
/// Created by a worker once its retry loop terminates; immutable thereafter.
/// `gender`, `age`, and `surgery_date` echo the source record so the result
/// store can build output rows without a join back to the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Index of the source record.
    pub index: usize,
    /// Gender echoed from the source record.
    pub gender: String,
    /// Age echoed from the source record.
    pub age: u32,
    /// Surgery date echoed from the source record.
    pub surgery_date: String,
    /// Model analysis text; `None` when the record failed.
    pub model_output: Option<String>,
    /// Terminal status.
    pub status: OutcomeStatus,
    /// Number of analysis calls actually made (1 + retries consumed).
    pub attempt_count: u32,
    /// Final error kind, recorded for failed records.
    pub last_error: Option<String>,
    /// When the outcome became terminal.
    pub completed_at: DateTime<Utc>,
}

impl AnalysisOutcome {
    /// Create a successful outcome.
    pub fn success(record: &CaseRecord, model_output: String, attempt_count: u32) -> Self {
        Self {
            index: record.index,
            gender: record.sex.clone(),
            age: record.age,
            surgery_date: record.surgery_day.clone(),
            model_output: Some(model_output),
            status: OutcomeStatus::Success,
            attempt_count,
            last_error: None,
            completed_at: Utc::now(),
        }
    }

    /// Create a failed outcome carrying the final error kind.
    pub fn failure(record: &CaseRecord, attempt_count: u32, error: &AnalysisError) -> Self {
        Self {
            index: record.index,
            gender: record.sex.clone(),
            age: record.age,
            surgery_date: record.surgery_day.clone(),
            model_output: None,
            status: OutcomeStatus::Failed,
            attempt_count,
            last_error: Some(error.to_string()),
            completed_at: Utc::now(),
        }
    }

    /// Returns whether the analysis succeeded.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
