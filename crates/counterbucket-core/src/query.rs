//! The query boundary between the engine and a backing store.
//!
//! The engine describes every aggregation it needs as a [`Query`] value. A
//! [`Querier`] executes it, either by scanning rows directly (see
//! [`crate::store::MemoryStore`]) or by sending [`Query::to_sql`] to a SQL
//! backend holding a `counter_data(counter_id, time, value)` table with
//! `time` in Unix seconds.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::context::Context;
use crate::error::Result;
use crate::interval::{Interval, Span};
use crate::models::{RecordWidth, WeekStart};

/// One row returned by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Point {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

/// An aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Sum of values per bucket for one counter.
    ///
    /// Rows with `buckets[0].begin <= time < buckets[last].end` are assigned
    /// to the first bucket whose `[begin, end)` contains them; rows matching
    /// no bucket are ignored. One point per non-empty bucket, timed at the
    /// bucket begin.
    BucketSum {
        counter_id: String,
        buckets: Vec<Interval>,
    },
    /// Latest reading time at or before `until`, optionally only strictly
    /// positive readings. Zero points when there is no such reading.
    Last {
        counter_id: String,
        until: DateTime<Utc>,
        non_zero: bool,
    },
    /// Highest per-period total over a set of counters.
    ///
    /// Rows whose local date (in `tz`) falls in the lookback are grouped by
    /// their local date truncated per `width`, summed per group, and the
    /// largest group is returned. Zero points when no row matches.
    ///
    /// [`Query::to_sql`] does not carry `tz`: the rendered SQL truncates in
    /// the SQLite server's `'localtime'`, which must be set to the same zone.
    HistoricalMax {
        counter_ids: Vec<String>,
        width: RecordWidth,
        week_start: WeekStart,
        lookback: Span,
        tz: Tz,
    },
}

impl Query {
    /// Renders the statement in the SQLite dialect.
    pub fn to_sql(&self) -> String {
        match self {
            Query::BucketSum {
                counter_id,
                buckets,
            } => bucket_sum_sql(counter_id, buckets),
            Query::Last {
                counter_id,
                until,
                non_zero,
            } => {
                let mut q = format!(
                    "select max(time) as time, 1 from counter_data where counter_id={} and time <= {}",
                    quote(counter_id),
                    until.timestamp()
                );
                if *non_zero {
                    q.push_str(" and value > 0");
                }
                q
            }
            Query::HistoricalMax {
                counter_ids,
                width,
                week_start,
                lookback,
                ..
            } => historical_max_sql(counter_ids, *width, *week_start, lookback),
        }
    }
}

/// Executes [`Query`] values against a backing store.
pub trait Querier {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Vec<Point>>;
}

impl<Q: Querier + ?Sized> Querier for &Q {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Vec<Point>> {
        (**self).query(ctx, query)
    }
}

fn bucket_sum_sql(counter_id: &str, buckets: &[Interval]) -> String {
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return format!(
            "select null as time, sum(value) from counter_data where counter_id={} and 0 group by 1",
            quote(counter_id)
        );
    };

    let whens: Vec<String> = buckets
        .iter()
        .map(|b| {
            format!(
                "when time >= {} and time < {} then {}",
                b.begin.timestamp(),
                b.end.timestamp(),
                b.begin.timestamp()
            )
        })
        .collect();

    format!(
        "select case {} end as time, sum(value) from counter_data where counter_id={} and time >= {} and time < {} group by 1",
        whens.join(" "),
        quote(counter_id),
        first.begin.timestamp(),
        last.end.timestamp()
    )
}

fn historical_max_sql(
    counter_ids: &[String],
    width: RecordWidth,
    week_start: WeekStart,
    lookback: &Span,
) -> String {
    let modifiers: Vec<&str> = match (width, week_start) {
        (RecordWidth::Day, _) => vec![],
        (RecordWidth::Week, WeekStart::Sunday) => {
            vec!["strftime('-%w days',time,'unixepoch','localtime')"]
        }
        (RecordWidth::Week, WeekStart::Monday) => vec!["'-6 days'", "'weekday 1'"],
        (RecordWidth::Month, _) => vec!["'start of month'"],
        (RecordWidth::Year, _) => vec!["'start of year'"],
    };

    let mut q = String::from("select cast(strftime('%s', date(time,'unixepoch','localtime'");
    for m in &modifiers {
        q.push(',');
        q.push_str(m);
    }
    q.push_str(")) as integer) as time, sum(value) from counter_data where ");

    let ids: Vec<String> = counter_ids.iter().map(|id| quote(id)).collect();
    let mut conds = vec![format!("counter_id in ({})", ids.join(","))];
    if let Some(begin) = &lookback.begin {
        conds.push(format!(
            "date(time,'unixepoch','localtime') >= '{}'",
            begin.date_naive().format("%Y-%m-%d")
        ));
    }
    if let Some(end) = &lookback.end {
        conds.push(format!(
            "date(time,'unixepoch','localtime') < '{}'",
            end.date_naive().format("%Y-%m-%d")
        ));
    }
    q.push_str(&conds.join(" and "));
    q.push_str(" group by 1 order by 2 desc limit 1");
    q
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
