//! Counter directory and service-range filtering.

use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::context::Context;
use crate::error::{CounterBucketError, Result};
use crate::interval::Span;
use crate::models::{Counter, ServiceRange};

/// Mode of the counters reported on by default.
pub const DEFAULT_MODE: &str = "cycling";

/// Full, unfiltered counter listing.
pub trait Directory {
    fn counters(&self, ctx: &Context) -> Result<Vec<Counter>>;
}

impl<D: Directory + ?Sized> Directory for &D {
    fn counters(&self, ctx: &Context) -> Result<Vec<Counter>> {
        (**self).counters(ctx)
    }
}

/// A fixed list of counters.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    counters: Vec<Counter>,
}

impl StaticDirectory {
    pub fn new(counters: Vec<Counter>) -> Self {
        Self { counters }
    }

    /// Parse a JSON array of directory counters.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let counters: Vec<Counter> = serde_json::from_str(json)
            .map_err(|e| CounterBucketError::Directory(format!("Invalid directory JSON: {}", e)))?;
        Ok(Self { counters })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            CounterBucketError::Directory(format!(
                "Failed to read directory '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }
}

impl Directory for StaticDirectory {
    fn counters(&self, ctx: &Context) -> Result<Vec<Counter>> {
        ctx.check()?;
        Ok(self.counters.clone())
    }
}

/// Filters an upstream directory down to the counters of one mode that were
/// in service during a span.
#[derive(Debug, Clone)]
pub struct ServiceDirectory<D> {
    dir: D,
    mode: String,
}

impl<D: Directory> ServiceDirectory<D> {
    pub fn new(dir: D) -> Self {
        Self::with_mode(dir, DEFAULT_MODE)
    }

    pub fn with_mode(dir: D, mode: impl Into<String>) -> Self {
        Self {
            dir,
            mode: mode.into(),
        }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Counters of the configured mode in service during `span`.
    pub fn counters(&self, ctx: &Context, span: &Span) -> Result<Vec<Counter>> {
        self.counters_for_mode(ctx, &self.mode, span)
    }

    /// Counters of `mode` with at least one service range overlapping
    /// `span`, in upstream order.
    pub fn counters_for_mode(&self, ctx: &Context, mode: &str, span: &Span) -> Result<Vec<Counter>> {
        let counters: Vec<Counter> = self
            .dir
            .counters(ctx)?
            .into_iter()
            .filter(|c| c.mode == mode)
            .filter(|c| c.service_ranges.iter().any(|sr| in_service(sr, span)))
            .collect();

        debug!(%span, mode, counters = counters.len(), "Resolved in-service counters");
        Ok(counters)
    }
}

/// Closed-boundary overlap: a range only drops out when it ends strictly
/// before the span begins or starts strictly after it ends.
fn in_service(sr: &ServiceRange, span: &Span) -> bool {
    //     |---|
    // |--|
    if let (Some(end), Some(begin)) = (sr.end, &span.begin) {
        if end < begin.with_timezone(&Utc) {
            return false;
        }
    }

    //     |---|
    //          |--|
    if let Some(end) = &span.end {
        if end.with_timezone(&Utc) < sr.start {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::tz::parse_tz;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap()
    }

    fn local(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        parse_tz("UTC")
            .unwrap()
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap()
    }

    fn span(begin: (i32, u32, u32), end: (i32, u32, u32)) -> Span {
        Interval::new(local(begin.0, begin.1, begin.2), local(end.0, end.1, end.2)).into()
    }

    fn counter(id: &str, mode: &str, ranges: Vec<ServiceRange>) -> Counter {
        Counter {
            id: id.to_string(),
            name: id.to_uppercase(),
            short_name: String::new(),
            mode: mode.to_string(),
            service_ranges: ranges,
        }
    }

    fn ids(counters: &[Counter]) -> Vec<&str> {
        counters.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn open_ended_range_qualifies_before_and_after_start() {
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![counter(
            "a",
            "cycling",
            vec![ServiceRange {
                start: utc(2020, 1, 1),
                end: None,
            }],
        )]));
        let ctx = Context::background();

        let june = dir.counters(&ctx, &span((2020, 6, 1), (2020, 7, 1))).unwrap();
        let straddling = dir.counters(&ctx, &span((2019, 6, 1), (2020, 6, 1))).unwrap();

        assert_eq!(ids(&june), vec!["a"]);
        assert_eq!(ids(&straddling), vec!["a"]);
    }

    #[test]
    fn ended_range_does_not_qualify_later() {
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![counter(
            "a",
            "cycling",
            vec![ServiceRange {
                start: utc(2018, 1, 1),
                end: Some(utc(2019, 12, 31)),
            }],
        )]));

        let jan = dir
            .counters(&Context::background(), &span((2020, 1, 1), (2020, 2, 1)))
            .unwrap();

        assert!(jan.is_empty());
    }

    #[test]
    fn range_starting_after_span_end_is_excluded() {
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![counter(
            "a",
            "cycling",
            vec![ServiceRange {
                start: utc(2021, 1, 1),
                end: None,
            }],
        )]));

        let before = dir
            .counters(&Context::background(), &span((2020, 1, 1), (2020, 2, 1)))
            .unwrap();

        assert!(before.is_empty());
    }

    #[test]
    fn unbounded_lookback_includes_retired_counters() {
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![
            counter(
                "old",
                "cycling",
                vec![ServiceRange {
                    start: utc(2015, 1, 1),
                    end: Some(utc(2016, 1, 1)),
                }],
            ),
            counter(
                "new",
                "cycling",
                vec![ServiceRange {
                    start: utc(2022, 1, 1),
                    end: None,
                }],
            ),
        ]));

        let all_time = dir
            .counters(&Context::background(), &Span::until(local(2023, 7, 21)))
            .unwrap();

        assert_eq!(ids(&all_time), vec!["old", "new"]);
    }

    #[test]
    fn filters_mode_and_keeps_order_without_duplicates() {
        let both = vec![
            ServiceRange {
                start: utc(2019, 1, 1),
                end: None,
            },
            ServiceRange {
                start: utc(2020, 1, 1),
                end: None,
            },
        ];
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![
            counter("c", "cycling", both.clone()),
            counter("w", "walking", both.clone()),
            counter("a", "cycling", both),
        ]));
        let jan = span((2020, 1, 1), (2020, 2, 1));
        let ctx = Context::background();

        assert_eq!(ids(&dir.counters(&ctx, &jan).unwrap()), vec!["c", "a"]);
        assert_eq!(
            ids(&dir.counters_for_mode(&ctx, "walking", &jan).unwrap()),
            vec!["w"]
        );
    }

    #[test]
    fn touching_boundaries_qualify() {
        // Range ends exactly at the span begin, and range starts exactly at
        // the span end: neither is strictly before, so both stay in.
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![
            counter(
                "ended",
                "cycling",
                vec![ServiceRange {
                    start: utc(2019, 1, 1),
                    end: Some(utc(2020, 1, 1)),
                }],
            ),
            counter(
                "started",
                "cycling",
                vec![ServiceRange {
                    start: utc(2020, 2, 1),
                    end: None,
                }],
            ),
        ]));
        let jan = span((2020, 1, 1), (2020, 2, 1));

        let counters = dir.counters(&Context::background(), &jan).unwrap();

        assert_eq!(ids(&counters), vec!["ended", "started"]);
        assert!(!Span::new(Some(local(2019, 1, 1)), Some(local(2020, 1, 1))).overlaps(&jan));
    }

    #[test]
    fn counter_without_ranges_never_qualifies() {
        let dir = ServiceDirectory::new(StaticDirectory::new(vec![counter("a", "cycling", vec![])]));
        let all = dir
            .counters(&Context::background(), &Span::new(None, None))
            .unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn loads_directory_json() {
        let dir = StaticDirectory::from_json_str(
            r#"[{"ID": "a", "Name": "Apple", "Mode": "cycling",
                 "ServiceRanges": [{"Start": "2020-01-01T00:00:00Z", "End": null}]}]"#,
        )
        .unwrap();
        let counters = dir.counters(&Context::background()).unwrap();

        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].service_ranges[0].end, None);
    }

    #[test]
    fn invalid_directory_json() {
        assert!(matches!(
            StaticDirectory::from_json_str("{"),
            Err(CounterBucketError::Directory(_))
        ));
    }
}
