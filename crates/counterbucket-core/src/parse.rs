//! Input parsing for report dates and reading timestamps.
//!
//! Report dates are local calendar dates, either `YYYY-MM-DD` or the compact
//! `YYYYMMDD` form. Reading timestamps are Unix seconds (the unit of the
//! `counter_data.time` column) or RFC3339 strings.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{CounterBucketError, Result};

/// Parse a local calendar date.
///
/// # Examples
///
/// ```
/// use counterbucket_core::parse::parse_date;
///
/// let a = parse_date("2023-07-21").unwrap();
/// let b = parse_date("20230721").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let format = if trimmed.contains('-') {
        "%Y-%m-%d"
    } else {
        "%Y%m%d"
    };

    NaiveDate::parse_from_str(trimmed, format).map_err(|e| {
        CounterBucketError::ParseError(format!(
            "Invalid date: '{}'. Expected YYYY-MM-DD or YYYYMMDD. Error: {}",
            input, e
        ))
    })
}

/// Parse Unix epoch seconds.
pub fn parse_epoch_seconds(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
        CounterBucketError::ParseError(format!("Epoch seconds out of range: {}", seconds))
    })
}

/// Parse a reading timestamp: integer epoch seconds or RFC3339.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(seconds) = trimmed.parse::<i64>() {
        return parse_epoch_seconds(seconds);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CounterBucketError::ParseError(format!(
                "Invalid timestamp: '{}'. Expected epoch seconds or RFC3339. Error: {}",
                input, e
            ))
        })
}
