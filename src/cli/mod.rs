//! Command-line parsing for the `gauge` binary.
//!
//! Argument parsing stays here; `app` turns parsed args into engine calls.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{DemandMetric, ForecastGapPolicy, Frequency, SeriesKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gauge", version, about = "Grid greenness and demand gauge (EIA-based)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute gauge readings for a balancing authority.
    Stats(StatsArgs),
    /// Fetch one raw series for a balancing authority and print it as CSV.
    Series(SeriesArgs),
    /// Re-print a stats JSON file saved with `gauge stats --export`.
    Show(ShowArgs),
}

/// Engine tunables; anything left unset keeps the environment/default value.
#[derive(Debug, Parser, Clone, Default)]
pub struct EngineArgs {
    /// Refetch cached series at least this old (seconds).
    #[arg(long)]
    pub max_age_secs: Option<i64>,

    /// Days of history to fetch.
    #[arg(long)]
    pub history_days: Option<i64>,

    /// Days past now to fetch (forecast), 1..=3.
    #[arg(long)]
    pub forecast_days: Option<i64>,

    /// Upstream request timeout (seconds).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Upstream period convention.
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    /// Low threshold as a fraction of the band center.
    #[arg(long)]
    pub low_pct: Option<f64>,

    /// High threshold as a fraction of the band center.
    #[arg(long)]
    pub high_pct: Option<f64>,

    /// How to treat demand periods without a forecast.
    #[arg(long, value_enum)]
    pub gap_policy: Option<ForecastGapPolicy>,

    /// Which demand ratio drives the demand gauge.
    #[arg(long, value_enum)]
    pub demand_metric: Option<DemandMetric>,
}

#[derive(Debug, Parser, Clone)]
pub struct StatsArgs {
    /// Balancing authority code (e.g. CISO, ERCO, PJM).
    #[arg(short = 'b', long)]
    pub ba: String,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print the dashboard JSON instead of the text summary.
    #[arg(long)]
    pub json: bool,

    /// Also write the dashboard JSON to a file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SeriesArgs {
    /// Balancing authority code.
    #[arg(short = 'b', long)]
    pub ba: String,

    /// Which series to fetch.
    #[arg(short = 'k', long, value_enum, default_value_t = SeriesKind::Mix)]
    pub kind: SeriesKind,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Write the CSV to a file instead of stdout.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Stats JSON file.
    #[arg(value_name = "JSON")]
    pub file: PathBuf,
}
