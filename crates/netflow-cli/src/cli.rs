//! CLI argument definitions for netflow.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | One cycle now, then one per cadence boundary, with a liveness endpoint |
//! | `scan` | One cycle printed to stdout, optionally written to the sink |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--sink` | `sheets` | Report surface (sheets, warehouse, memory) |
//! | `--timeout-ms` | `10000` | Per-request timeout in ms |
//! | `--concurrency` | `8` | Symbols evaluated at the same time |
//! | `--empty-policy` | `skip` | What to write when nothing qualifies |
//!
//! # Examples
//!
//! ```bash
//! # Run forever, writing to Google Sheets
//! NETFLOW_CREDENTIALS_PATH=key.json NETFLOW_SPREADSHEET_ID=abc netflow run
//!
//! # One cycle into a local DuckDB file
//! netflow --sink warehouse run --once
//!
//! # Print the current ranking as JSON
//! netflow scan --format json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use netflow_core::http_client::DEFAULT_TIMEOUT_MS;
use netflow_core::scan::DEFAULT_CONCURRENCY;
use netflow_report::EmptyBatchPolicy;

pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Hourly net-inflow scanner for Binance USDT perpetuals.
#[derive(Debug, Parser)]
#[command(
    name = "netflow",
    author,
    version,
    about = "Hourly net-inflow scanner for Binance USDT perpetuals",
    long_about = "netflow ranks the most liquid Binance USDT perpetuals by taker net inflow \
over the last 24 hours, adds a money-flow ratio and a stop-loss level, and appends \
the ranking to a monthly report sheet."
)]
pub struct Cli {
    /// Report surface that batches are written to.
    #[arg(long, global = true, value_enum, default_value_t = SinkKind::Sheets)]
    pub sink: SinkKind,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Symbols evaluated at the same time.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// What to write when no symbol qualifies (skip, placeholder).
    #[arg(long, global = true, default_value_t = EmptyBatchPolicy::Skip)]
    pub empty_policy: EmptyBatchPolicy,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Google Sheets spreadsheet (needs credentials and a spreadsheet id).
    Sheets,
    /// Local DuckDB file.
    Warehouse,
    /// Process memory; nothing survives the process.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one cycle now, then one at every cadence boundary.
    ///
    /// # Examples
    ///
    ///   netflow run
    ///   netflow run --interval-minutes 15 --port 9000
    ///   netflow --sink warehouse run --once
    Run(RunArgs),

    /// Run a single cycle and print the ranking.
    ///
    /// # Examples
    ///
    ///   netflow scan
    ///   netflow scan --format json
    ///   netflow --sink warehouse scan --write
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run a single cycle and exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Do not serve the liveness endpoint.
    #[arg(long, default_value_t = false)]
    pub no_liveness: bool,

    /// Liveness port; falls back to `PORT`, then 8080.
    #[arg(long)]
    pub port: Option<u16>,

    /// Minutes between cycles; cycles start on multiples of this.
    #[arg(
        long,
        default_value_t = DEFAULT_INTERVAL_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..=1440)
    )]
    pub interval_minutes: u32,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Also write the batch to the configured sink.
    #[arg(long, default_value_t = false)]
    pub write: bool,
}
