//! caseforge CLI entry point.
//!
//! Initializes logging (console plus the append-only diagnostic log file)
//! and delegates to the CLI module for the run itself.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first to get log_level and log_file
    let cli = caseforge::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    caseforge::cli::run_with_cli(cli).await
}
