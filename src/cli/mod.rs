//! Command-line interface for caseforge.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
