use std::process::ExitCode;

use chrono::Utc;
use chrono_tz::Tz;
use counterbucket_core::tz::{format_rfc3339, format_rfc3339_utc};
use counterbucket_core::{Context, CounterSeries, RecordKind, Records};
use serde::Serialize;
use tracing::info;

use crate::cli::ReportArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{Sources, parse_date_or_input_error, parse_period};

#[derive(Debug, Serialize)]
struct ReportOutput {
    period: String,
    start: String,
    end: String,
    total: i64,
    record: RecordKind,
    counters: Vec<CounterLine>,
    missing: Vec<MissingLine>,
    notes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct CounterLine {
    id: String,
    name: String,
    value: i64,
    record: RecordKind,
}

#[derive(Debug, Serialize)]
struct MissingLine {
    id: String,
    name: String,
    last_seen: Option<String>,
}

pub fn run_report(args: ReportArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let sources = Sources::load(&args.source)?;
    let period = parse_period(&args.period)?;
    let date = parse_date_or_input_error(&args.date)?;

    let interval = period.interval(date, sources.tz, sources.week_start);
    let label = period.label(&interval);
    let ctx = Context::background();
    let current = sources.querier().query(&ctx, &[interval.clone()])?;

    if !current.iter().any(|cs| cs.total() > 0) {
        info!(%interval, "Nothing counted, skipping records");
        match output_format {
            OutputFormat::Json => println!("{}", to_json(&serde_json::json!({ "period": label, "total": 0 }))?),
            OutputFormat::Text => println!("No counts for {}", label),
        }
        return Ok(ExitCode::from(EXIT_SUCCESS));
    }

    let records = sources
        .record_checker()
        .check(&ctx, &interval.begin, &current, period.width())?;

    // A reading stamped exactly at the period end sets the staleness markers
    // but lands in no bucket, so an empty series is missing too.
    let since = interval.begin.with_timezone(&Utc);
    let (mut missing, mut present): (Vec<&CounterSeries>, Vec<&CounterSeries>) = current
        .iter()
        .partition(|cs| cs.series.is_empty() || cs.is_missing(since));
    for list in [&mut present, &mut missing] {
        list.sort_by(|a, b| a.counter.display_name().cmp(b.counter.display_name()));
    }

    let output = ReportOutput {
        period: label,
        start: format_rfc3339(&interval.begin),
        end: format_rfc3339(&interval.end),
        total: current.iter().filter_map(CounterSeries::current).sum(),
        record: records.sum(),
        counters: present.iter().map(|cs| counter_line(cs, &records)).collect(),
        missing: missing
            .iter()
            .map(|cs| MissingLine {
                id: cs.counter.id.clone(),
                name: cs.counter.display_name().to_string(),
                last_seen: cs.last_seen().as_ref().map(format_rfc3339_utc),
            })
            .collect(),
        notes: records.notes(),
    };

    match output_format {
        OutputFormat::Json => println!("{}", to_json(&output)?),
        OutputFormat::Text => print!("{}", render_text(&output, &missing, sources.tz)),
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

fn counter_line(cs: &CounterSeries, records: &Records) -> CounterLine {
    CounterLine {
        id: cs.counter.id.clone(),
        name: cs.counter.display_name().to_string(),
        value: cs.current().unwrap_or(0),
        record: records.counter(&cs.counter.id),
    }
}

fn render_text(output: &ReportOutput, missing: &[&CounterSeries], tz: Tz) -> String {
    let mut out = format!("{}{} counted {}\n", output.total, output.record.symbol(), output.period);

    out.push('\n');
    for line in &output.counters {
        out.push_str(&format!("{}{} {}\n", line.value, line.record.symbol(), line.name));
    }

    if !output.notes.is_empty() {
        out.push('\n');
        for note in &output.notes {
            out.push_str(note);
            out.push('\n');
        }
    }

    if !missing.is_empty() {
        out.push_str("\nMissing (last):\n");
        for cs in missing {
            let seen = cs
                .last_seen()
                .map(|t| t.with_timezone(&tz).format("%b %-d").to_string())
                .unwrap_or_else(|| "never".to_string());
            out.push_str(&format!("{} ({})\n", cs.counter.display_name(), seen));
        }
    }

    out
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))
}
