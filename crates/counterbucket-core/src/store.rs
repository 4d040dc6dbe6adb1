//! In-memory backing store.
//!
//! [`MemoryStore`] answers [`Query`] values by scanning its readings, with
//! the same bucket and truncation semantics a SQL backend gives the
//! rendered statements.

use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{CounterBucketError, Result};
use crate::interval::{Interval, Span};
use crate::models::{RecordWidth, WeekStart};
use crate::parse::{parse_epoch_seconds, parse_instant};
use crate::query::{Point, Querier, Query};
use crate::tz::local_midnight;

/// One raw counter reading.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterReading {
    pub counter_id: String,
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl CounterReading {
    pub fn new(counter_id: impl Into<String>, time: DateTime<Utc>, value: f64) -> Self {
        Self {
            counter_id: counter_id.into(),
            time,
            value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawReading {
    counter_id: String,
    time: RawTime,
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTime {
    Epoch(i64),
    Text(String),
}

/// Readings held in memory, queried by full scan.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    readings: Vec<CounterReading>,
}

impl MemoryStore {
    pub fn new(readings: Vec<CounterReading>) -> Self {
        Self { readings }
    }

    /// Load JSON lines of `{"counter_id": .., "time": .., "value": ..}`.
    ///
    /// `time` is epoch seconds or an RFC3339 string. Blank lines are skipped.
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self> {
        let mut readings = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                CounterBucketError::ParseError(format!("Failed to read line {}: {}", idx + 1, e))
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let raw: RawReading = serde_json::from_str(trimmed).map_err(|e| {
                CounterBucketError::ParseError(format!("Line {}: {}", idx + 1, e))
            })?;
            let time = match raw.time {
                RawTime::Epoch(seconds) => parse_epoch_seconds(seconds)?,
                RawTime::Text(text) => parse_instant(&text)?,
            };
            readings.push(CounterReading::new(raw.counter_id, time, raw.value));
        }

        debug!(readings = readings.len(), "Loaded counter readings");
        Ok(Self { readings })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    fn bucket_sum(&self, counter_id: &str, buckets: &[Interval]) -> Vec<Point> {
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Vec::new();
        };

        let mut sums: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for r in self.readings.iter().filter(|r| r.counter_id == counter_id) {
            if r.time < first.begin || r.time >= last.end {
                continue;
            }
            if let Some(bucket) = buckets.iter().find(|b| b.contains(r.time)) {
                *sums.entry(bucket.begin.with_timezone(&Utc)).or_insert(0.0) += r.value;
            }
        }

        sums.into_iter().map(|(t, v)| Point::new(t, v)).collect()
    }

    fn last(&self, counter_id: &str, until: DateTime<Utc>, non_zero: bool) -> Vec<Point> {
        self.readings
            .iter()
            .filter(|r| r.counter_id == counter_id && r.time <= until)
            .filter(|r| !non_zero || r.value > 0.0)
            .map(|r| r.time)
            .max()
            .map(|t| vec![Point::new(t, 1.0)])
            .unwrap_or_default()
    }

    fn historical_max(
        &self,
        counter_ids: &[String],
        width: RecordWidth,
        week_start: WeekStart,
        lookback: &Span,
        tz: Tz,
    ) -> Vec<Point> {
        let begin = lookback.begin.as_ref().map(|b| b.date_naive());
        let end = lookback.end.as_ref().map(|e| e.date_naive());

        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for r in self
            .readings
            .iter()
            .filter(|r| counter_ids.iter().any(|id| *id == r.counter_id))
        {
            let date = r.time.with_timezone(&tz).date_naive();
            if begin.is_some_and(|b| date < b) || end.is_some_and(|e| date >= e) {
                continue;
            }
            *totals
                .entry(truncate_date(date, width, week_start))
                .or_insert(0.0) += r.value;
        }

        let mut best: Option<(NaiveDate, f64)> = None;
        for (date, total) in totals {
            if best.is_none_or(|(_, v)| total > v) {
                best = Some((date, total));
            }
        }

        best.map(|(date, total)| vec![Point::new(local_midnight(date, tz).with_timezone(&Utc), total)])
            .unwrap_or_default()
    }
}

impl Querier for MemoryStore {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Vec<Point>> {
        ctx.check()?;
        trace!(sql = %query.to_sql(), "Executing query in memory");

        let points = match query {
            Query::BucketSum {
                counter_id,
                buckets,
            } => self.bucket_sum(counter_id, buckets),
            Query::Last {
                counter_id,
                until,
                non_zero,
            } => self.last(counter_id, *until, *non_zero),
            Query::HistoricalMax {
                counter_ids,
                width,
                week_start,
                lookback,
                tz,
            } => self.historical_max(counter_ids, *width, *week_start, lookback, *tz),
        };

        Ok(points)
    }
}

/// Truncate a local date to the start of its record period.
pub fn truncate_date(date: NaiveDate, width: RecordWidth, week_start: WeekStart) -> NaiveDate {
    match width {
        RecordWidth::Day => date,
        RecordWidth::Week => date - Duration::days(i64::from(week_start.days_since(date.weekday()))),
        RecordWidth::Month => date.with_day(1).unwrap_or(date),
        RecordWidth::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}
