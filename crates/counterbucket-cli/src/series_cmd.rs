use std::process::ExitCode;

use counterbucket_core::tz::{format_rfc3339, format_rfc3339_utc};
use counterbucket_core::{Context, CounterSeries};
use serde::Serialize;

use crate::cli::SeriesArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{Sources, parse_date_or_input_error, parse_period, parse_split};

#[derive(Debug, Serialize)]
struct SeriesOutput {
    id: String,
    name: String,
    total: i64,
    last: Option<String>,
    last_non_zero: Option<String>,
    buckets: Vec<BucketOutput>,
}

#[derive(Debug, Serialize)]
struct BucketOutput {
    start: String,
    end: String,
    value: i64,
}

impl From<&CounterSeries> for SeriesOutput {
    fn from(cs: &CounterSeries) -> Self {
        Self {
            id: cs.counter.id.clone(),
            name: cs.counter.display_name().to_string(),
            total: cs.total(),
            last: cs.last.as_ref().map(format_rfc3339_utc),
            last_non_zero: cs.last_non_zero.as_ref().map(format_rfc3339_utc),
            buckets: cs
                .series
                .iter()
                .map(|b| BucketOutput {
                    start: format_rfc3339(&b.range.begin),
                    end: format_rfc3339(&b.range.end),
                    value: b.val,
                })
                .collect(),
        }
    }
}

pub fn run_series(args: SeriesArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let sources = Sources::load(&args.source)?;
    let period = parse_period(&args.period)?;
    let date = parse_date_or_input_error(&args.start)?;

    let interval = period.interval(date, sources.tz, sources.week_start);
    let buckets = match &args.split {
        Some(split) => parse_split(split)?.buckets(&interval),
        None => vec![interval],
    };

    let ctx = Context::background();
    let series = sources.querier().query(&ctx, &buckets)?;

    match output_format {
        OutputFormat::Json => {
            let output: Vec<SeriesOutput> = series.iter().map(SeriesOutput::from).collect();
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for cs in &series {
                let seen = cs
                    .last_seen()
                    .map(|t| format_rfc3339(&t.with_timezone(&sources.tz)))
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{} ({}): total {}, last seen {}",
                    cs.counter.display_name(),
                    cs.counter.id,
                    cs.total(),
                    seen
                );
                for b in &cs.series {
                    println!("  {} {}", format_rfc3339(&b.range.begin), b.val);
                }
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
