//! Command-line parsing for the COVID-19 trends dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the data and forecasting code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{Metric, MissingSubRegionPolicy};
use crate::query::Breakdown;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covid", version, about = "Dutch COVID-19 trends: queries and ARIMA forecasts (RIVM open data)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the dataset and print a summary (years, provinces, cleaning stats).
    Info(InfoArgs),
    /// Aggregate cases, admissions and deaths for a year and region scope.
    Query(QueryArgs),
    /// Forecast a metric with ARIMA(4,1,4) and a 55% band.
    Forecast(ForecastArgs),
    /// Plot a previously exported forecast JSON.
    Plot(PlotArgs),
}

/// Where to load the sources from and how to fetch them.
///
/// Anything not given here falls back to the environment, then to the
/// built-in RIVM endpoints.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Case/mortality sources (comma-separated URLs or paths, concatenated in order).
    #[arg(long, value_delimiter = ',', value_name = "URI")]
    pub cases: Vec<String>,

    /// Hospital admission sources (comma-separated URLs or paths).
    #[arg(long, value_delimiter = ',', value_name = "URI")]
    pub admissions: Vec<String>,

    /// Per-request timeout for remote sources, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra attempts after a transient fetch failure.
    #[arg(long)]
    pub retries: Option<u32>,

    /// What to do with case rows that have no municipality.
    #[arg(long = "unknown-municipalities", value_enum, default_value_t = MissingSubRegionPolicy::Drop)]
    pub unknown_municipalities: MissingSubRegionPolicy,
}

#[derive(Debug, Args, Clone, Default)]
pub struct InfoArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Year to aggregate (defaults to the latest year in the data).
    #[arg(short = 'y', long)]
    pub year: Option<i32>,

    /// `Netherlands`, `All provinces`, or a province name.
    #[arg(short = 'r', long, default_value = "Netherlands")]
    pub region: String,

    /// Breakdown for a single province.
    #[arg(long, value_enum, default_value_t = Breakdown::None)]
    pub by: Breakdown,

    /// Print percentage shares per province/municipality instead of totals.
    #[arg(long)]
    pub share: bool,

    /// Metrics to show (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = Metric::ALL)]
    pub metrics: Vec<Metric>,

    /// Export the resulting view to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Metric to forecast.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::TotalReported)]
    pub metric: Metric,

    /// First date to show (YYYY-MM-DD).
    #[arg(long, value_name = "DATE", conflicts_with = "months_window")]
    pub from: Option<NaiveDate>,

    /// Show the last N months of history instead of a fixed start date.
    #[arg(long, default_value_t = 3)]
    pub months_window: u32,

    /// Days to forecast past the last observed date.
    #[arg(short = 'd', long, default_value_t = 7)]
    pub days: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the forecast table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the forecast (with model metadata) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for plotting a saved forecast.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Forecast JSON file produced by `covid forecast --export-json`.
    #[arg(long, value_name = "JSON")]
    pub forecast: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
