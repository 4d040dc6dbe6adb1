//! Per-bucket counter sums and staleness markers.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::Context;
use crate::directory::{Directory, ServiceDirectory};
use crate::error::{CounterBucketError, Result};
use crate::interval::{Interval, Span};
use crate::models::{BucketValue, Counter, CounterSeries};
use crate::query::{Point, Querier, Query};

/// Turns counters and buckets into [`CounterSeries`].
#[derive(Debug, Clone)]
pub struct TimeRangeQuerier<D, Q> {
    directory: ServiceDirectory<D>,
    querier: Q,
}

impl<D: Directory, Q: Querier> TimeRangeQuerier<D, Q> {
    pub fn new(directory: ServiceDirectory<D>, querier: Q) -> Self {
        Self { directory, querier }
    }

    /// Bucket sums for every counter in service during the buckets' span.
    ///
    /// The span runs from the first bucket's begin to the last bucket's end.
    pub fn query(&self, ctx: &Context, buckets: &[Interval]) -> Result<Vec<CounterSeries>> {
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Ok(Vec::new());
        };

        let span: Span = Interval::new(first.begin, last.end).into();
        let counters = self.directory.counters(ctx, &span)?;
        self.query_counters(ctx, &counters, buckets)
    }

    /// Bucket sums plus `last`/`last_non_zero` for the given counters.
    ///
    /// Counters with no readings, or only zeros, in the buckets are kept
    /// with an empty series so their staleness is still reported.
    pub fn query_counters(
        &self,
        ctx: &Context,
        counters: &[Counter],
        buckets: &[Interval],
    ) -> Result<Vec<CounterSeries>> {
        let Some(last_bucket) = buckets.last() else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for counter in counters {
            let series = self.bucket_values(ctx, &counter.id, buckets)?;
            if series.iter().map(|b| b.val).sum::<i64>() == 0 {
                continue;
            }
            out.push(CounterSeries {
                series,
                ..CounterSeries::new(counter.clone())
            });
        }

        let until = last_bucket.end.with_timezone(&Utc);
        for counter in counters {
            let (last, last_non_zero) = self.last(ctx, &counter.id, until)?;

            match out.iter_mut().find(|cs| cs.counter.id == counter.id) {
                Some(cs) => {
                    cs.last = last;
                    cs.last_non_zero = last_non_zero;
                }
                None => out.push(CounterSeries {
                    last,
                    last_non_zero,
                    ..CounterSeries::new(counter.clone())
                }),
            }
        }

        debug!(
            counters = counters.len(),
            buckets = buckets.len(),
            reporting = out.iter().filter(|cs| !cs.series.is_empty()).count(),
            "Queried counter series"
        );
        Ok(out)
    }

    /// One value per bucket in caller order, zero-filled. Empty when the
    /// store had no rows at all for the counter.
    fn bucket_values(
        &self,
        ctx: &Context,
        counter_id: &str,
        buckets: &[Interval],
    ) -> Result<Vec<BucketValue>> {
        let points = self.querier.query(
            ctx,
            &Query::BucketSum {
                counter_id: counter_id.to_string(),
                buckets: buckets.to_vec(),
            },
        )?;
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let values = buckets
            .iter()
            .map(|b| {
                let val = points
                    .iter()
                    .find(|p| p.time == b.begin)
                    .map(|p| p.value as i64)
                    .unwrap_or(0);
                BucketValue {
                    range: b.clone(),
                    val,
                }
            })
            .collect();
        Ok(values)
    }

    /// Latest reading time, and latest strictly positive reading time, at or
    /// before `until`.
    pub fn last(
        &self,
        ctx: &Context,
        counter_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let last_query = |non_zero| Query::Last {
            counter_id: counter_id.to_string(),
            until,
            non_zero,
        };

        let all = scalar_time(&self.querier.query(ctx, &last_query(false))?)?;
        if all.is_none() {
            return Ok((None, None));
        }
        let non_zero = scalar_time(&self.querier.query(ctx, &last_query(true))?)?;

        Ok((all, non_zero))
    }
}

fn scalar_time(points: &[Point]) -> Result<Option<DateTime<Utc>>> {
    match points {
        [] => Ok(None),
        [p] => Ok(Some(p.time)),
        _ => Err(CounterBucketError::Invariant(format!(
            "scalar aggregate returned {} points",
            points.len()
        ))),
    }
}
