//! # counterbucket-core
//!
//! Interval-bucketed aggregation and record detection for counter
//! time-series.
//!
//! The engine turns raw counter readings into per-bucket sums, "last seen"
//! staleness markers, and all-time / year-to-date record badges, looking
//! only at counters that were in service during the queried interval.
//!
//! ## Features
//!
//! - **Calendar-aware intervals**: Half-open `[begin, end)` ranges in an IANA
//!   timezone, shifted and split on local wall-clock time.
//! - **Bucket sums**: One sum per requested bucket, zero-filled, in caller order.
//! - **Staleness**: Last reading and last positive reading per counter.
//! - **Records**: All-time before year-to-date, ties are not records.
//! - **Pluggable stores**: Anything implementing [`Querier`]; an in-memory
//!   [`MemoryStore`] is included, and every query renders to SQLite SQL.
//!
//! ## Example
//!
//! ```rust
//! use counterbucket_core::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let tz = parse_tz("America/Halifax").unwrap();
//! let dir = StaticDirectory::from_json_str(
//!     r#"[{"ID": "a", "Name": "Apple", "Mode": "cycling",
//!          "ServiceRanges": [{"Start": "2020-01-01T00:00:00Z"}]}]"#,
//! ).unwrap();
//! let store = MemoryStore::new(vec![CounterReading::new(
//!     "a",
//!     Utc.with_ymd_and_hms(2023, 7, 21, 15, 0, 0).unwrap(),
//!     42.0,
//! )]);
//!
//! let ctx = Context::background();
//! let day = Interval::day_of(parse_date("2023-07-21").unwrap(), tz);
//! let trq = TimeRangeQuerier::new(ServiceDirectory::new(&dir), &store);
//! let series = trq.query(&ctx, &[day.clone()]).unwrap();
//! assert_eq!(series[0].current(), Some(42));
//!
//! let rc = RecordChecker::new(ServiceDirectory::new(&dir), &store);
//! let records = rc.check(&ctx, &day.begin, &series, RecordWidth::Day).unwrap();
//! assert_eq!(records.counter("a"), RecordKind::AllTime);
//! ```

pub mod context;
pub mod directory;
pub mod error;
pub mod interval;
pub mod models;
pub mod parse;
pub mod querier;
pub mod query;
pub mod record;
pub mod store;
pub mod tz;

// Re-export commonly used types at the crate root
pub use context::{CancelHandle, Context};
pub use directory::{DEFAULT_MODE, Directory, ServiceDirectory, StaticDirectory};
pub use error::{CounterBucketError, Result};
pub use interval::{Interval, Span};
pub use models::{
    BucketValue, Counter, CounterSeries, RecordKind, RecordWidth, ServiceRange, WeekStart,
};
pub use querier::TimeRangeQuerier;
pub use query::{Point, Querier, Query};
pub use record::{RecordChecker, Records};
pub use store::{CounterReading, MemoryStore};

/// Prelude module for convenient imports.
///
/// ```
/// use counterbucket_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::directory::{Directory, ServiceDirectory, StaticDirectory};
    pub use crate::error::{CounterBucketError, Result};
    pub use crate::interval::{Interval, Span};
    pub use crate::models::*;
    pub use crate::parse::{parse_date, parse_instant};
    pub use crate::querier::TimeRangeQuerier;
    pub use crate::query::{Point, Querier, Query};
    pub use crate::record::{RecordChecker, Records};
    pub use crate::store::{CounterReading, MemoryStore};
    pub use crate::tz::parse_tz;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use chrono::{Duration, TimeZone, Utc};

    fn halifax_noon(d: u32) -> chrono::DateTime<Utc> {
        parse_tz("America/Halifax")
            .unwrap()
            .with_ymd_and_hms(2023, 7, d, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn daily_report_workflow() {
        let tz = parse_tz("America/Halifax").unwrap();
        let dir = StaticDirectory::from_json_str(
            r#"[
                {"ID": "a", "Name": "Apple", "Mode": "cycling",
                 "ServiceRanges": [{"Start": "2020-01-01T00:00:00Z"}]},
                {"ID": "b", "Name": "Banana", "Mode": "cycling",
                 "ServiceRanges": [{"Start": "2020-01-01T00:00:00Z"}]}
            ]"#,
        )
        .unwrap();
        let store = MemoryStore::new(vec![
            CounterReading::new("a", halifax_noon(20), 30.0),
            CounterReading::new("b", halifax_noon(20), 10.0),
            CounterReading::new("a", halifax_noon(21), 25.0),
            CounterReading::new("b", halifax_noon(21), 0.0),
        ]);
        let ctx = Context::background();
        let day = Interval::day_of(parse_date("20230721").unwrap(), tz);

        let trq = TimeRangeQuerier::new(ServiceDirectory::new(&dir), &store);
        let cs = trq.query(&ctx, &[day.clone()]).unwrap();

        assert_eq!(cs.len(), 2);
        assert_eq!(cs[0].current(), Some(25));
        assert!(cs[1].series.is_empty());
        assert!(cs[1].is_missing(day.begin.with_timezone(&Utc)));
        assert_eq!(cs[1].last_seen(), Some(halifax_noon(20)));

        let rc = RecordChecker::new(ServiceDirectory::new(&dir), &store);
        let records = rc.check(&ctx, &day.begin, &cs, RecordWidth::Day).unwrap();
        assert_eq!(records.counter("a"), RecordKind::None);
        assert_eq!(records.sum(), RecordKind::None);

        let hours = day.split_by_duration(Duration::hours(1));
        let hourly = trq.query(&ctx, &hours).unwrap();
        assert_eq!(hourly[0].series[12].val, 25);
    }

    #[test]
    fn prelude_exports() {
        let _tz = parse_tz("UTC").unwrap();
        let _width = RecordWidth::Day;
        let _kind = RecordKind::None;
    }
}
