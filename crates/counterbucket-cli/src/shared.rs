use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::Context as _;
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use counterbucket_core::prelude::*;
use tracing::debug;

use crate::cli::SourceArgs;
use crate::error::{CliError, CliResult};

/// Calendar period a command reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// The local period containing `date`.
    pub fn interval(self, date: NaiveDate, tz: Tz, week_start: WeekStart) -> Interval {
        match self {
            Period::Day => Interval::day_of(date, tz),
            Period::Week => Interval::week_of(date, tz, week_start),
            Period::Month => Interval::month_of(date, tz),
            Period::Year => Interval::year_of(date, tz),
        }
    }

    pub fn width(self) -> RecordWidth {
        match self {
            Period::Day => RecordWidth::Day,
            Period::Week => RecordWidth::Week,
            Period::Month => RecordWidth::Month,
            Period::Year => RecordWidth::Year,
        }
    }

    /// Human label for the period starting at `begin`, e.g. "Fri Jul 21".
    pub fn label(self, interval: &Interval) -> String {
        let begin = interval.begin;
        match self {
            Period::Day => begin.format("%a %b %-d").to_string(),
            Period::Week => begin.format("week of %b %-d").to_string(),
            Period::Month => begin.format("%B %Y").to_string(),
            Period::Year => begin.format("%Y").to_string(),
        }
    }
}

impl From<RecordWidth> for Period {
    fn from(width: RecordWidth) -> Self {
        match width {
            RecordWidth::Day => Period::Day,
            RecordWidth::Week => Period::Week,
            RecordWidth::Month => Period::Month,
            RecordWidth::Year => Period::Year,
        }
    }
}

/// Bucket size inside a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Split {
    pub fn buckets(self, interval: &Interval) -> Vec<Interval> {
        match self {
            Split::Hour => interval.split_by_duration(Duration::hours(1)),
            Split::Day => interval.split_by_calendar_unit(0, 0, 1),
            Split::Week => interval.split_by_calendar_unit(0, 0, 7),
            Split::Month => interval.split_by_calendar_unit(0, 1, 0),
            Split::Year => interval.split_by_calendar_unit(1, 0, 0),
        }
    }
}

pub fn parse_period(s: &str) -> CliResult<Period> {
    match s.to_lowercase().as_str() {
        "day" => Ok(Period::Day),
        "week" => Ok(Period::Week),
        "month" => Ok(Period::Month),
        "year" => Ok(Period::Year),
        _ => Err(CliError::input(format!(
            "Invalid period '{}'. Expected: day, week, month, year",
            s
        ))),
    }
}

pub fn parse_split(s: &str) -> CliResult<Split> {
    match s.to_lowercase().as_str() {
        "hour" => Ok(Split::Hour),
        "day" => Ok(Split::Day),
        "week" => Ok(Split::Week),
        "month" => Ok(Split::Month),
        "year" => Ok(Split::Year),
        _ => Err(CliError::input(format!(
            "Invalid split '{}'. Expected: hour, day, week, month, year",
            s
        ))),
    }
}

pub fn parse_width(s: &str) -> CliResult<RecordWidth> {
    s.parse::<RecordWidth>().map_err(CliError::from)
}

pub fn parse_week_start(s: &str) -> CliResult<WeekStart> {
    match s.to_lowercase().as_str() {
        "monday" => Ok(WeekStart::Monday),
        "sunday" => Ok(WeekStart::Sunday),
        _ => Err(CliError::input(format!(
            "Invalid week_start '{}'. Expected: monday, sunday",
            s
        ))),
    }
}

pub fn parse_date_or_input_error(s: &str) -> CliResult<NaiveDate> {
    parse_date(s).map_err(CliError::from)
}

pub fn parse_tz_or_input_error(name: &str) -> CliResult<Tz> {
    parse_tz(name).map_err(CliError::from)
}

/// Everything a command needs to query: counters, readings and local
/// calendar settings.
pub struct Sources {
    pub directory: StaticDirectory,
    pub store: MemoryStore,
    pub tz: Tz,
    pub week_start: WeekStart,
    pub mode: String,
}

impl Sources {
    pub fn load(args: &SourceArgs) -> CliResult<Self> {
        let tz = parse_tz_or_input_error(&args.tz)?;
        let week_start = parse_week_start(&args.week_start)?;
        let directory = StaticDirectory::from_json_file(&args.directory)?;
        let store = read_store(&args.data).map_err(|e| CliError::input(format!("{e:#}")))?;
        debug!(
            readings = store.len(),
            tz = %tz,
            mode = %args.mode,
            "Loaded sources"
        );

        Ok(Self {
            directory,
            store,
            tz,
            week_start,
            mode: args.mode.clone(),
        })
    }

    pub fn querier(&self) -> TimeRangeQuerier<&StaticDirectory, &MemoryStore> {
        TimeRangeQuerier::new(self.service_directory(), &self.store)
    }

    pub fn record_checker(&self) -> RecordChecker<&StaticDirectory, &MemoryStore> {
        RecordChecker::new(self.service_directory(), &self.store).with_week_start(self.week_start)
    }

    fn service_directory(&self) -> ServiceDirectory<&StaticDirectory> {
        ServiceDirectory::with_mode(&self.directory, self.mode.clone())
    }
}

fn read_store(path: &str) -> anyhow::Result<MemoryStore> {
    let reader: Box<dyn BufRead> = if path == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(path).with_context(|| format!("Failed to open data file '{}'", path))?;
        Box::new(BufReader::new(file))
    };

    MemoryStore::from_json_lines(reader).with_context(|| format!("Failed to load readings from '{}'", path))
}
