//! Error types for caseforge operations.
//!
//! Defines error types for the three subsystems that can fail:
//! - Input loading (the tabular case batch)
//! - Remote analysis (LLM API interactions)
//! - Result persistence (Parquet primary, CSV fallback)

use thiserror::Error;

/// Errors that can occur while loading the input case batch.
///
/// All of these are fatal for the run; row-level coercion failures are
/// handled by the loader's skip-and-log policy instead.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Required column '{0}' not found in input header")]
    MissingColumn(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during a remote analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Failed to parse analysis response: {0}")]
    ParseError(String),

    #[error("Empty completion from model")]
    EmptyResponse,
}

impl AnalysisError {
    /// Whether retrying the call can reasonably succeed.
    ///
    /// Transient: network timeouts and connection failures, rate limits,
    /// server errors, and empty completions. Everything else (client errors,
    /// auth failures, malformed responses) is permanent and not worth a
    /// retry budget.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::RequestFailed(msg) => {
                msg.contains("timeout")
                    || msg.contains("timed out")
                    || msg.contains("connection")
                    || msg.contains("temporarily")
                    || msg.contains("Connection refused")
            }
            AnalysisError::RateLimited(_) => true,
            AnalysisError::Api { code, .. } => *code >= 500 || *code == 429,
            AnalysisError::EmptyResponse => true,
            AnalysisError::ParseError(_) => false,
        }
    }
}

/// Errors that can occur while persisting the result set.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Primary persistence failed ({primary}); fallback also failed ({fallback})")]
    BothFailed { primary: String, fallback: String },
}
