//! Core data types for counterbucket.
//!
//! This module defines the primary types used throughout the library:
//! - [`Counter`] and [`ServiceRange`] - Directory entries (read-only)
//! - [`BucketValue`] - One bucket sum
//! - [`CounterSeries`] - Bucket sums plus staleness markers for a counter
//! - [`RecordKind`] - Record badge of a value
//! - [`RecordWidth`] - Calendar truncation used when comparing periods
//! - [`WeekStart`] - Week boundary configuration

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CounterBucketError;
use crate::interval::Interval;

/// The span during which a counter was deployed and collecting data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRange {
    pub start: DateTime<Utc>,
    /// `None` means the counter is still in service.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// A counter as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Counter {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub mode: String,
    #[serde(default)]
    pub service_ranges: Vec<ServiceRange>,
}

impl Counter {
    /// The short name when set, else the full name.
    pub fn display_name(&self) -> &str {
        if self.short_name.is_empty() {
            &self.name
        } else {
            &self.short_name
        }
    }
}

/// Sum of values for one requested bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketValue {
    pub range: Interval,
    pub val: i64,
}

/// Bucket sums and staleness markers for one counter.
///
/// Built fresh for each query call. `series` has one entry per requested
/// bucket, or is empty when the counter had nothing to report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSeries {
    pub counter: Counter,
    pub series: Vec<BucketValue>,
    /// Most recent reading of any value at or before the queried end.
    pub last: Option<DateTime<Utc>>,
    /// Most recent strictly positive reading at or before the queried end.
    pub last_non_zero: Option<DateTime<Utc>>,
}

impl CounterSeries {
    pub fn new(counter: Counter) -> Self {
        Self {
            counter,
            series: Vec::new(),
            last: None,
            last_non_zero: None,
        }
    }

    /// Sum over all buckets.
    pub fn total(&self) -> i64 {
        self.series.iter().map(|b| b.val).sum()
    }

    /// Value of the first bucket, the one compared against history.
    pub fn current(&self) -> Option<i64> {
        self.series.first().map(|b| b.val)
    }

    /// Whether the counter failed to report, or reported only zeros, since
    /// `since`.
    pub fn is_missing(&self, since: DateTime<Utc>) -> bool {
        let seen = |t: Option<DateTime<Utc>>| t.is_some_and(|t| t >= since);
        !(seen(self.last) && seen(self.last_non_zero))
    }

    /// The best "last seen" marker: last positive reading, else last reading.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_non_zero.or(self.last)
    }
}

/// Record badge attached to a period value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    None,
    YearToDate,
    AllTime,
}

impl RecordKind {
    /// Marker appended to a value in report text.
    pub fn symbol(self) -> &'static str {
        match self {
            RecordKind::AllTime => "**",
            RecordKind::YearToDate => "*",
            RecordKind::None => "",
        }
    }

    /// Legend line explaining [`RecordKind::symbol`].
    pub fn note(self) -> &'static str {
        match self {
            RecordKind::AllTime => "** all-time record",
            RecordKind::YearToDate => "* year-to-date record",
            RecordKind::None => "",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::None => write!(f, "none"),
            RecordKind::YearToDate => write!(f, "year_to_date"),
            RecordKind::AllTime => write!(f, "all_time"),
        }
    }
}

/// Calendar granularity of the periods compared for records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordWidth {
    /// Whole local days, no truncation
    #[default]
    Day,
    /// Local weeks, truncated to the week start day
    Week,
    /// Local months, truncated to the 1st
    Month,
    /// Local years, truncated to January 1st
    Year,
}

impl std::fmt::Display for RecordWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordWidth::Day => write!(f, "day"),
            RecordWidth::Week => write!(f, "week"),
            RecordWidth::Month => write!(f, "month"),
            RecordWidth::Year => write!(f, "year"),
        }
    }
}

impl FromStr for RecordWidth {
    type Err = CounterBucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(RecordWidth::Day),
            "week" => Ok(RecordWidth::Week),
            "month" => Ok(RecordWidth::Month),
            "year" => Ok(RecordWidth::Year),
            _ => Err(CounterBucketError::UnsupportedWidth(s.to_string())),
        }
    }
}

/// Week start day configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// Week starts on Sunday
    #[default]
    Sunday,
    /// Week starts on Monday (ISO 8601)
    Monday,
}

impl WeekStart {
    /// Days elapsed since the start of the week containing `weekday`.
    pub fn days_since(self, weekday: chrono::Weekday) -> u32 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday(),
            WeekStart::Monday => weekday.num_days_from_monday(),
        }
    }
}

impl std::fmt::Display for WeekStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeekStart::Monday => write!(f, "monday"),
            WeekStart::Sunday => write!(f, "sunday"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn counter(id: &str, name: &str, short_name: &str) -> Counter {
        Counter {
            id: id.to_string(),
            name: name.to_string(),
            short_name: short_name.to_string(),
            mode: "cycling".to_string(),
            service_ranges: Vec::new(),
        }
    }

    #[test]
    fn display_name_prefers_short_name() {
        assert_eq!(counter("a", "Apple Street", "Apple").display_name(), "Apple");
        assert_eq!(counter("b", "Banana", "").display_name(), "Banana");
    }

    #[test]
    fn record_kind_priority_ordering() {
        assert!(RecordKind::AllTime > RecordKind::YearToDate);
        assert!(RecordKind::YearToDate > RecordKind::None);
        assert_eq!(RecordKind::default(), RecordKind::None);
    }

    #[test]
    fn record_kind_symbols_and_notes() {
        assert_eq!(RecordKind::AllTime.symbol(), "**");
        assert_eq!(RecordKind::YearToDate.symbol(), "*");
        assert_eq!(RecordKind::None.symbol(), "");
        assert_eq!(RecordKind::AllTime.note(), "** all-time record");
        assert_eq!(RecordKind::YearToDate.note(), "* year-to-date record");
    }

    #[test]
    fn record_width_from_str() {
        assert_eq!("day".parse::<RecordWidth>().unwrap(), RecordWidth::Day);
        assert_eq!("WEEK".parse::<RecordWidth>().unwrap(), RecordWidth::Week);
        assert_eq!("month".parse::<RecordWidth>().unwrap(), RecordWidth::Month);
        assert_eq!("year".parse::<RecordWidth>().unwrap(), RecordWidth::Year);
        assert!(matches!(
            "fortnight".parse::<RecordWidth>(),
            Err(CounterBucketError::UnsupportedWidth(_))
        ));
    }

    #[test]
    fn week_start_default_is_sunday() {
        assert_eq!(WeekStart::default(), WeekStart::Sunday);
        assert_eq!(WeekStart::Sunday.days_since(chrono::Weekday::Sun), 0);
        assert_eq!(WeekStart::Sunday.days_since(chrono::Weekday::Sat), 6);
        assert_eq!(WeekStart::Monday.days_since(chrono::Weekday::Sun), 6);
    }

    #[test]
    fn staleness_helpers() {
        let day = Utc.with_ymd_and_hms(2023, 7, 21, 0, 0, 0).single().unwrap();
        let earlier = Utc.with_ymd_and_hms(2023, 6, 21, 0, 0, 0).single().unwrap();

        let mut cs = CounterSeries::new(counter("a", "Apple", ""));
        assert!(cs.is_missing(day));
        assert_eq!(cs.last_seen(), None);

        cs.last = Some(day);
        cs.last_non_zero = Some(earlier);
        assert!(cs.is_missing(day));
        assert_eq!(cs.last_seen(), Some(earlier));

        cs.last_non_zero = Some(day);
        assert!(!cs.is_missing(day));
    }

    #[test]
    fn counter_deserializes_directory_json() {
        let json = r#"{
            "ID": "100059339",
            "Name": "South Park Street",
            "ShortName": "South Park",
            "Mode": "cycling",
            "ServiceRanges": [
                {"Start": "2020-01-01T00:00:00Z"},
                {"Start": "2018-01-01T00:00:00Z", "End": "2019-01-01T00:00:00Z"}
            ]
        }"#;
        let c: Counter = serde_json::from_str(json).unwrap();

        assert_eq!(c.id, "100059339");
        assert_eq!(c.display_name(), "South Park");
        assert_eq!(c.service_ranges.len(), 2);
        assert_eq!(c.service_ranges[0].end, None);
        assert!(c.service_ranges[1].end.is_some());
    }

    #[test]
    fn record_width_serialization() {
        assert_eq!(serde_json::to_string(&RecordWidth::Week).unwrap(), "\"week\"");
        assert_eq!(
            serde_json::to_string(&RecordKind::YearToDate).unwrap(),
            "\"year_to_date\""
        );
    }
}
