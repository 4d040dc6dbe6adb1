//! Half-open time ranges in a named timezone.
//!
//! [`Interval`] is always bounded and is what buckets are made of.
//! [`Span`] may be unbounded on either side and is used for record
//! lookback windows and directory service filtering.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::WeekStart;
use crate::tz::{format_rfc3339, local_midnight, resolve_local};

/// A half-open range `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub begin: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Interval {
    pub fn new(begin: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { begin, end }
    }

    /// `[begin, begin + years/months/days)`, shifted on local calendar time.
    pub fn calendar(begin: DateTime<Tz>, years: i32, months: i32, days: i64) -> Self {
        let end = add_calendar(&begin, years, months, days);
        Self { begin, end }
    }

    /// `[begin, begin + d)`.
    pub fn duration(begin: DateTime<Tz>, d: Duration) -> Self {
        let end = add_duration(&begin, d);
        Self { begin, end }
    }

    /// The local day containing `date`.
    pub fn day_of(date: NaiveDate, tz: Tz) -> Self {
        Self::calendar(local_midnight(date, tz), 0, 0, 1)
    }

    /// The local week containing `date`.
    pub fn week_of(date: NaiveDate, tz: Tz, week_start: WeekStart) -> Self {
        Self::day_of(date, tz).truncate_to_week_start(week_start)
    }

    /// The local month containing `date`.
    pub fn month_of(date: NaiveDate, tz: Tz) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        Self::calendar(local_midnight(first, tz), 0, 1, 0)
    }

    /// The local year containing `date`.
    pub fn year_of(date: NaiveDate, tz: Tz) -> Self {
        Self::calendar(start_of_year(&local_midnight(date, tz)), 1, 0, 0)
    }

    pub fn timezone(&self) -> Tz {
        self.begin.timezone()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.begin <= instant && instant < self.end
    }

    /// Both bounds moved by the same calendar amount.
    pub fn shift_by_calendar_unit(&self, years: i32, months: i32, days: i64) -> Self {
        Self {
            begin: add_calendar(&self.begin, years, months, days),
            end: add_calendar(&self.end, years, months, days),
        }
    }

    /// Both bounds moved by the same absolute duration.
    pub fn shift_by_duration(&self, d: Duration) -> Self {
        Self {
            begin: add_duration(&self.begin, d),
            end: add_duration(&self.end, d),
        }
    }

    /// The seven-day local week whose first day contains `begin`.
    pub fn truncate_to_week_start(&self, week_start: WeekStart) -> Self {
        let date = self.begin.naive_local().date();
        let back = i64::from(week_start.days_since(date.weekday()));
        let first = date - Duration::days(back);
        Self::calendar(local_midnight(first, self.timezone()), 0, 0, 7)
    }

    /// Consecutive calendar-unit intervals starting at `begin`.
    ///
    /// Sub-intervals are produced while their begin is before `end`; the
    /// last one is not clipped and may extend past `end`.
    pub fn split_by_calendar_unit(&self, years: i32, months: i32, days: i64) -> Vec<Interval> {
        let mut current = Interval::calendar(self.begin.clone(), years, months, days);
        if current.end <= current.begin {
            return Vec::new();
        }

        let mut out = Vec::new();
        while current.begin < self.end {
            let next = current.shift_by_calendar_unit(years, months, days);
            let stalled = next.begin <= current.begin;
            out.push(current);
            if stalled {
                break;
            }
            current = next;
        }
        out
    }

    /// Consecutive fixed-duration intervals starting at `begin`.
    ///
    /// Same unclipped tail behavior as [`Interval::split_by_calendar_unit`].
    pub fn split_by_duration(&self, d: Duration) -> Vec<Interval> {
        if d <= Duration::zero() {
            return Vec::new();
        }

        let mut current = Interval::duration(self.begin.clone(), d);
        let mut out = Vec::new();
        while current.begin < self.end {
            let next = current.shift_by_duration(d);
            // Saturated at the end of time; nothing further to produce.
            let stalled = next.begin <= current.begin;
            out.push(current);
            if stalled {
                break;
            }
            current = next;
        }
        out
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_rfc3339(&self.begin),
            format_rfc3339(&self.end)
        )
    }
}

/// A half-open range whose bounds may be absent (unbounded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub begin: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
}

impl Span {
    pub fn new(begin: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> Self {
        Self { begin, end }
    }

    /// `[unbounded, end)`.
    pub fn until(end: DateTime<Tz>) -> Self {
        Self {
            begin: None,
            end: Some(end),
        }
    }

    /// Whether the two spans share any instant. Unbounded sides never exclude.
    ///
    /// Strictly half-open: spans that only touch do not overlap. The
    /// directory's service filter keeps touching ranges instead.
    pub fn overlaps(&self, other: &Span) -> bool {
        if let (Some(end), Some(begin)) = (&self.end, &other.begin) {
            if end <= begin {
                return false;
            }
        }
        if let (Some(end), Some(begin)) = (&other.end, &self.begin) {
            if end <= begin {
                return false;
            }
        }
        true
    }
}

impl From<Interval> for Span {
    fn from(interval: Interval) -> Self {
        Self {
            begin: Some(interval.begin),
            end: Some(interval.end),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_bound = |b: &Option<DateTime<Tz>>| match b {
            Some(dt) => format_rfc3339(dt),
            None => "unbounded".to_string(),
        };
        write!(f, "[{}, {})", fmt_bound(&self.begin), fmt_bound(&self.end))
    }
}

/// Local midnight on January 1st of the year containing `dt`.
pub fn start_of_year(dt: &DateTime<Tz>) -> DateTime<Tz> {
    let date = dt.naive_local().date();
    let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
    local_midnight(first, dt.timezone())
}

/// `dt + d`, saturating at chrono's representable range.
fn add_duration(dt: &DateTime<Tz>, d: Duration) -> DateTime<Tz> {
    dt.checked_add_signed(d).unwrap_or_else(|| {
        let bound = if d > Duration::zero() {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        };
        bound.with_timezone(&dt.timezone())
    })
}

/// Add years, months, then days to the local wall-clock time of `dt`.
///
/// Month arithmetic clamps to the last day of the target month.
fn add_calendar(dt: &DateTime<Tz>, years: i32, months: i32, days: i64) -> DateTime<Tz> {
    let local = dt.naive_local();
    let total_months = i64::from(years) * 12 + i64::from(months);
    let forward = total_months > 0 || (total_months == 0 && days >= 0);

    let shifted = shift_months(local, total_months)
        .and_then(|l| l.checked_add_signed(Duration::try_days(days)?));

    // Outside chrono's representable range; saturate.
    let shifted = shifted.unwrap_or(if forward {
        NaiveDateTime::MAX
    } else {
        NaiveDateTime::MIN
    });

    resolve_local(shifted, dt.timezone())
}

fn shift_months(local: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        local.checked_add_months(magnitude)
    } else {
        local.checked_sub_months(magnitude)
    }
}
