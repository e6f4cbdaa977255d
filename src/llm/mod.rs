//! Remote analysis client for the case batch pipeline.
//!
//! [`AnalysisClient`] is the trait seam the scheduler depends on;
//! [`ChatClient`] is the production implementation speaking an
//! OpenAI-compatible chat-completions API. Prompt assembly lives in
//! [`prompt`].

pub mod client;
pub mod prompt;

pub use client::{AnalysisClient, ChatClient, ClientConfig};
