//! Result accumulation and durable persistence.
//!
//! [`ResultSet`] accumulates outcomes keyed by record index; [`persist`]
//! writes the sorted rows to the primary Parquet output, degrading to the
//! CSV fallback when the primary write fails. Degradation is always
//! reported, never silent.

pub mod delimited;
pub mod parquet;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StoreError;
use crate::scheduler::AnalysisOutcome;

/// Column order shared by the primary and fallback formats.
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "index",
    "gender",
    "age",
    "surgery_date",
    "model_output",
    "status",
    "attempt_count",
];

/// Accumulated outcomes keyed by record index.
///
/// Insertion order is irrelevant; iteration is always sorted by index, which
/// is the ordering contract for the persisted output.
#[derive(Debug, Default)]
pub struct ResultSet {
    outcomes: BTreeMap<usize, AnalysisOutcome>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one terminal outcome.
    ///
    /// A duplicate index is a scheduler bug; the newer outcome wins and the
    /// collision is logged.
    pub fn insert(&mut self, outcome: AnalysisOutcome) {
        let index = outcome.index;
        if self.outcomes.insert(index, outcome).is_some() {
            warn!(index, "Duplicate outcome for record index");
        }
    }

    /// Number of accumulated outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns whether the set holds no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns whether an outcome exists for the given record index.
    pub fn contains(&self, index: usize) -> bool {
        self.outcomes.contains_key(&index)
    }

    /// Outcomes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.outcomes.values()
    }

    /// Number of successful outcomes.
    pub fn success_count(&self) -> usize {
        self.iter().filter(|outcome| outcome.is_success()).count()
    }

    /// Fraction of outcomes that succeeded (0.0 for an empty set).
    pub fn success_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.success_count() as f64 / self.len() as f64
    }

    /// Mean attempt count across all outcomes (0.0 for an empty set).
    pub fn average_attempts(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let total: u64 = self.iter().map(|outcome| u64::from(outcome.attempt_count)).sum();
        total as f64 / self.len() as f64
    }

    /// Number of successful outcomes whose output carries a format warning.
    pub fn format_warning_count(&self) -> usize {
        self.iter()
            .filter_map(|outcome| outcome.model_output.as_deref())
            .filter(|output| output.contains("(Format Warning"))
            .count()
    }
}

/// Destination that ended up holding the run's artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistDestination {
    /// The primary Parquet output.
    Primary,
    /// The CSV fallback; its presence signals a persistence-degraded run.
    Fallback,
}

/// Report of a completed persistence attempt.
#[derive(Debug, Clone)]
pub struct PersistReport {
    /// Which destination holds the artifact.
    pub destination: PersistDestination,
    /// Final path of the artifact.
    pub path: PathBuf,
    /// Number of rows written.
    pub rows: usize,
}

/// Persist the result set, preferring Parquet and degrading to CSV.
///
/// # Errors
///
/// Returns `StoreError::BothFailed` only when the fallback write fails too;
/// a primary failure alone degrades with a WARN log and a
/// [`PersistDestination::Fallback`] report.
pub fn persist(
    results: &ResultSet,
    primary: &Path,
    fallback: &Path,
) -> Result<PersistReport, StoreError> {
    match parquet::write_parquet(results, primary) {
        Ok(()) => {
            info!(
                path = %primary.display(),
                rows = results.len(),
                "Results written to primary output"
            );
            Ok(PersistReport {
                destination: PersistDestination::Primary,
                path: primary.to_path_buf(),
                rows: results.len(),
            })
        }
        Err(primary_err) => {
            warn!(
                error = %primary_err,
                path = %primary.display(),
                "Primary persistence failed; falling back to CSV"
            );

            match delimited::write_csv(results, fallback) {
                Ok(()) => {
                    warn!(
                        path = %fallback.display(),
                        rows = results.len(),
                        "Results written to fallback output; run is persistence-degraded"
                    );
                    Ok(PersistReport {
                        destination: PersistDestination::Fallback,
                        path: fallback.to_path_buf(),
                        rows: results.len(),
                    })
                }
                Err(fallback_err) => Err(StoreError::BothFailed {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                }),
            }
        }
    }
}

/// Temporary sibling path used for all-or-nothing writes.
///
/// Writers produce `<path>.tmp` and rename into place on success, so a
/// failed write never leaves a partial artifact at the final path.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}
