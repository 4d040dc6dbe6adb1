use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Periodic counter reports: bucket sums, staleness and records
#[derive(Parser, Debug)]
#[command(name = "counterbucket", version)]
#[command(about = "Periodic counter reports: bucket sums, staleness and records")]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sum counter readings per bucket over a period
    Series(SeriesArgs),
    /// Classify a period's totals as all-time or year-to-date records
    Records(RecordsArgs),
    /// Totals, records and missing counters for one period
    Report(ReportArgs),
}

#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// Counter directory JSON file
    #[arg(long, env = "COUNTERBUCKET_DIRECTORY")]
    pub directory: PathBuf,

    /// Counter readings, JSON lines (use - for stdin)
    #[arg(long, env = "COUNTERBUCKET_DATA")]
    pub data: String,

    /// IANA timezone periods are computed in
    #[arg(short, long, env = "COUNTERBUCKET_TZ", default_value = "America/Halifax")]
    pub tz: String,

    /// Counter mode to report on
    #[arg(long, default_value = "cycling")]
    pub mode: String,

    /// Week start day: sunday or monday
    #[arg(long, default_value = "sunday")]
    pub week_start: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Local date inside the period (YYYY-MM-DD or YYYYMMDD)
    #[arg(long)]
    pub start: String,

    /// Period to query: day, week, month, year
    #[arg(short = 'p', long, default_value = "day")]
    pub period: String,

    /// Bucket size within the period: hour, day, week, month, year
    #[arg(long)]
    pub split: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Local date inside the period (YYYY-MM-DD or YYYYMMDD)
    #[arg(long)]
    pub date: String,

    /// Record width: day, week, month, year
    #[arg(short = 'w', long, default_value = "day")]
    pub width: String,
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Local date inside the period (YYYY-MM-DD or YYYYMMDD)
    #[arg(long)]
    pub date: String,

    /// Report period: day, week, month, year
    #[arg(short = 'p', long, default_value = "day")]
    pub period: String,
}
