use std::collections::BTreeMap;
use std::process::ExitCode;

use counterbucket_core::tz::format_rfc3339;
use counterbucket_core::{Context, RecordKind, RecordWidth};
use serde::Serialize;
use tracing::info;

use crate::cli::RecordsArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{Period, Sources, parse_date_or_input_error, parse_width};

#[derive(Debug, Serialize)]
struct RecordsOutput {
    before: String,
    width: RecordWidth,
    sum: RecordKind,
    total: i64,
    counters: BTreeMap<String, RecordKind>,
}

pub fn run_records(args: RecordsArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let sources = Sources::load(&args.source)?;
    let width = parse_width(&args.width)?;
    let date = parse_date_or_input_error(&args.date)?;

    let interval = Period::from(width).interval(date, sources.tz, sources.week_start);
    let ctx = Context::background();
    let current = sources.querier().query(&ctx, &[interval.clone()])?;
    let records = sources
        .record_checker()
        .check(&ctx, &interval.begin, &current, width)?;
    info!(%interval, %width, sum = %records.sum(), "Checked records");

    let output = RecordsOutput {
        before: format_rfc3339(&interval.begin),
        width,
        sum: records.sum(),
        total: current.iter().filter_map(|cs| cs.current()).sum(),
        counters: records.counters().clone(),
    };

    match output_format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{} records before {}", output.width, output.before);
            println!("sum {}: {}", output.total, output.sum);
            for (id, kind) in &output.counters {
                println!("{}: {}", id, kind);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
