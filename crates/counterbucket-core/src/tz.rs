//! Local wall-clock resolution in IANA zones.
//!
//! Bucket boundaries are computed on local wall-clock time and resolved
//! back to instants independently, so a day bucket spanning a DST switch is
//! 23 or 25 hours long.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CounterBucketError, Result};

/// Parse an IANA timezone name into a [`chrono_tz::Tz`].
///
/// # Examples
///
/// ```
/// use counterbucket_core::tz::parse_tz;
///
/// let tz = parse_tz("America/Halifax").unwrap();
/// assert_eq!(tz.to_string(), "America/Halifax");
/// ```
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CounterBucketError::InvalidTimezone(name.to_string()))
}

/// Resolve a local wall-clock time in `tz` to a zoned instant.
///
/// Ambiguous times (DST fall back) resolve to the earlier occurrence.
/// Nonexistent times (DST spring forward) resolve to the first valid local
/// time after the gap.
pub fn resolve_local(local: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    let resolved = tz.from_local_datetime(&local);
    if let Some(dt) = resolved.single().or_else(|| resolved.earliest()) {
        return dt;
    }

    // Gaps are at most a few hours; search forward a minute at a time.
    let max_minutes = 2 * 24 * 60;
    for minutes in 1..=max_minutes {
        let Some(candidate) = local.checked_add_signed(Duration::minutes(minutes)) else {
            break;
        };
        let resolved = tz.from_local_datetime(&candidate);
        if let Some(dt) = resolved.single().or_else(|| resolved.earliest()) {
            return dt;
        }
    }

    // No zone has a two-day gap; treat the wall clock as UTC.
    Utc.from_utc_datetime(&local).with_timezone(&tz)
}

/// Local midnight of `date` in `tz`.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    resolve_local(date.and_time(chrono::NaiveTime::MIN), tz)
}

/// RFC3339 with the zone's offset, second precision.
pub fn format_rfc3339<T: TimeZone>(dt: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// RFC3339 in UTC with a `Z` suffix.
pub fn format_rfc3339_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
