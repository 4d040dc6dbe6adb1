use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod records_cmd;
mod report_cmd;
mod series_cmd;
mod shared;

use cli::{Cli, Commands};
use error::{CliResult, OutputFormat, render_error};
use records_cmd::run_records;
use report_cmd::run_report;
use series_cmd::run_series;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Series(args) => {
            let format = args.source.output_format.clone();
            dispatch(&format, |output_format| run_series(args, output_format))
        }
        Commands::Records(args) => {
            let format = args.source.output_format.clone();
            dispatch(&format, |output_format| run_records(args, output_format))
        }
        Commands::Report(args) => {
            let format = args.source.output_format.clone();
            dispatch(&format, |output_format| run_report(args, output_format))
        }
    }
}

fn dispatch(
    format: &str,
    run: impl FnOnce(OutputFormat) -> CliResult<ExitCode>,
) -> ExitCode {
    let output_format = match format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(err) => return render_error(&err, OutputFormat::hint(format)),
    };

    match run(output_format) {
        Ok(code) => code,
        Err(err) => render_error(&err, output_format),
    }
}
