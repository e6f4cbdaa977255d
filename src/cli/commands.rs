//! CLI definition and run wiring for caseforge.
//!
//! Single entry point: load the case batch, fan it out through the
//! scheduler, and persist the result set, degrading to the CSV fallback
//! when the primary write fails.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::llm::{ChatClient, ClientConfig};
use crate::records;
use crate::scheduler::batch::DEFAULT_CONCURRENCY;
use crate::scheduler::{BatchScheduler, ProgressMonitor, RetryPolicy};
use crate::store::{self, PersistDestination};

/// Default model requested from the analysis service.
const DEFAULT_MODEL: &str = "o3-mini";

/// Default primary output path.
const DEFAULT_OUTPUT: &str = "analysis_results.parquet";

/// Default fallback output path.
const DEFAULT_FALLBACK: &str = "analysis_results.csv";

/// How often the background monitor logs batch progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Concurrent LLM analysis for batches of medical case records.
#[derive(Parser, Debug)]
#[command(name = "caseforge")]
#[command(about = "Analyze a batch of medical case records with an LLM inference service")]
#[command(version)]
pub struct Cli {
    /// Input CSV with one case per row (columns: AGE, SEX, chief complaint,
    /// present history, past history, DAY, CTA).
    pub input: PathBuf,

    /// Primary output path (Parquet).
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Fallback output path (CSV), used only when the primary write fails.
    #[arg(long, default_value = DEFAULT_FALLBACK)]
    pub fallback: PathBuf,

    /// Number of concurrent analysis workers.
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Maximum analysis calls per record (1 + retries).
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in seconds.
    #[arg(long, default_value_t = 1)]
    pub backoff_base: u64,

    /// Upper bound on a single backoff delay, in seconds.
    #[arg(long, default_value_t = 60)]
    pub backoff_cap: u64,

    /// Per-call deadline for the analysis service, in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Base URL of the OpenAI-compatible analysis API.
    #[arg(long, env = "CASEFORGE_API_BASE")]
    pub api_base: String,

    /// Bearer token for the analysis API.
    #[arg(long, env = "CASEFORGE_API_KEY")]
    pub api_key: Option<String>,

    /// Model identifier to request.
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Append-only diagnostic log file.
    #[arg(long, default_value = "caseforge.log")]
    pub log_file: PathBuf,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the full pipeline with parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let records = records::load(&cli.input)
        .with_context(|| format!("Failed to load case batch from {}", cli.input.display()))?;
    let total = records.len();

    let config = ClientConfig {
        base_url: cli.api_base.clone(),
        api_key: cli.api_key.clone(),
        model: cli.model.clone(),
        timeout: Duration::from_secs(cli.timeout),
    };
    let client = Arc::new(ChatClient::new(config));

    info!(
        api_base = %cli.api_base,
        model = %cli.model,
        api_key = %client.api_key_masked(),
        concurrency = cli.concurrency,
        max_attempts = cli.max_attempts,
        "Analysis client configured"
    );

    let retry = RetryPolicy::new(
        cli.max_attempts,
        Duration::from_secs(cli.backoff_base),
        Duration::from_secs(cli.backoff_cap),
    );
    let scheduler = BatchScheduler::new(client, retry, cli.concurrency);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let monitor = ProgressMonitor::start(scheduler.counters(), total, PROGRESS_INTERVAL);
    let results = scheduler.run(records, shutdown_rx).await;
    monitor.stop().await;

    if results.len() < total {
        warn!(
            completed = results.len(),
            total, "Run interrupted; persisting partial results"
        );
    }

    let report = store::persist(&results, &cli.output, &cli.fallback)
        .context("Failed to persist results to both primary and fallback outputs")?;

    info!(
        destination = match report.destination {
            PersistDestination::Primary => "primary",
            PersistDestination::Fallback => "fallback",
        },
        path = %report.path.display(),
        rows = report.rows,
        success_rate = format!("{:.1}%", results.success_rate() * 100.0),
        format_warnings = results.format_warning_count(),
        average_attempts = format!("{:.1}", results.average_attempts()),
        "Analysis run complete"
    );

    Ok(())
}
