//! All-time and year-to-date record detection.
//!
//! A current period value is a record when it is strictly greater than
//! every historical period total of the same width in the lookback window.
//! All-time is checked first; a value that sets an all-time record is not
//! also reported as a year-to-date record.

use std::collections::BTreeMap;
use std::slice;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::context::Context;
use crate::directory::{Directory, ServiceDirectory};
use crate::error::Result;
use crate::interval::{Span, start_of_year};
use crate::models::{Counter, CounterSeries, RecordKind, RecordWidth, WeekStart};
use crate::query::{Querier, Query};

/// Record badges for one report period.
///
/// Counters without a record have no entry; lookups return
/// [`RecordKind::None`] for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Records {
    counters: BTreeMap<String, RecordKind>,
    sum: RecordKind,
}

impl Records {
    pub fn counter(&self, id: &str) -> RecordKind {
        self.counters.get(id).copied().unwrap_or_default()
    }

    /// Record of the sum over all in-service counters.
    pub fn sum(&self) -> RecordKind {
        self.sum
    }

    pub fn counters(&self) -> &BTreeMap<String, RecordKind> {
        &self.counters
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.sum == RecordKind::None
    }

    /// Legend lines for every kind present, all-time first.
    pub fn notes(&self) -> Vec<&'static str> {
        [RecordKind::AllTime, RecordKind::YearToDate]
            .into_iter()
            .filter(|k| self.sum == *k || self.counters.values().any(|v| v == k))
            .map(RecordKind::note)
            .collect()
    }
}

/// Classifies current period totals against history.
#[derive(Debug, Clone)]
pub struct RecordChecker<D, Q> {
    directory: ServiceDirectory<D>,
    querier: Q,
    week_start: WeekStart,
}

impl<D: Directory, Q: Querier> RecordChecker<D, Q> {
    pub fn new(directory: ServiceDirectory<D>, querier: Q) -> Self {
        Self {
            directory,
            querier,
            week_start: WeekStart::default(),
        }
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Lookback windows in evaluation order.
    ///
    /// Year-to-date is omitted for [`RecordWidth::Year`].
    pub fn lookbacks(before: &DateTime<Tz>, width: RecordWidth) -> Vec<(RecordKind, Span)> {
        let mut out = vec![(RecordKind::AllTime, Span::until(*before))];
        if width != RecordWidth::Year {
            out.push((
                RecordKind::YearToDate,
                Span::new(Some(start_of_year(before)), Some(*before)),
            ));
        }
        out
    }

    /// Records for each counter's current value and for their sum.
    ///
    /// The current value of a counter is the first bucket of its series;
    /// counters with an empty series are skipped. The sum is compared
    /// against every counter in service during each lookback window, not
    /// only those in `current`.
    pub fn check(
        &self,
        ctx: &Context,
        before: &DateTime<Tz>,
        current: &[CounterSeries],
        width: RecordWidth,
    ) -> Result<Records> {
        let lookbacks = Self::lookbacks(before, width);
        let mut records = Records::default();

        for cs in current {
            let Some(val) = cs.current() else {
                continue;
            };
            for (kind, lookback) in &lookbacks {
                if self.is_record(ctx, slice::from_ref(&cs.counter), width, lookback, val)? {
                    debug!(counter = %cs.counter.id, %kind, val, "Counter record");
                    records.counters.insert(cs.counter.id.clone(), *kind);
                    break;
                }
            }
        }

        let sum: i64 = current.iter().filter_map(CounterSeries::current).sum();
        for (kind, lookback) in &lookbacks {
            let counters = self.directory.counters(ctx, lookback)?;
            if self.is_record(ctx, &counters, width, lookback, sum)? {
                debug!(%kind, sum, "Sum record");
                records.sum = *kind;
                break;
            }
        }

        Ok(records)
    }

    /// Whether `current` beats the best `width` period of `counters` in
    /// `lookback`. No history at all counts as a record; a tie does not.
    pub fn is_record(
        &self,
        ctx: &Context,
        counters: &[Counter],
        width: RecordWidth,
        lookback: &Span,
        current: i64,
    ) -> Result<bool> {
        let tz = lookback
            .end
            .as_ref()
            .or(lookback.begin.as_ref())
            .map(|dt| dt.timezone())
            .unwrap_or(chrono_tz::UTC);

        let query = Query::HistoricalMax {
            counter_ids: counters.iter().map(|c| c.id.clone()).collect(),
            width,
            week_start: self.week_start,
            lookback: lookback.clone(),
            tz,
        };
        let points = self.querier.query(ctx, &query)?;

        let Some(best) = points.first() else {
            return Ok(true);
        };
        Ok((best.value as i64) < current)
    }
}
