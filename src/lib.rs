//! caseforge: concurrent LLM analysis for batches of medical case records.
//!
//! Reads a tabular case batch, fans each record out to a bounded pool of
//! analysis workers with retry/backoff around every remote call, and
//! persists exactly one outcome per record to Parquet, with a CSV fallback
//! when the primary write fails.

// Core modules
pub mod cli;
pub mod error;
pub mod llm;
pub mod records;
pub mod scheduler;
pub mod store;

// Re-export commonly used error types
pub use error::{AnalysisError, InputError, StoreError};
