//! Time-bucketed series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::error::CoreError;
use crate::params::RequestParams;
use crate::types::Timestamp;

/// Zero-filled series longer than this are returned unfilled.
pub const MAX_FILLED_POINTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
    Week,
}

impl Granularity {
    /// Bucket size for a window of the given span. Unbounded windows use
    /// weeks.
    pub fn for_span(span: Option<Duration>) -> Self {
        match span {
            Some(s) if s <= Duration::hours(1) => Granularity::Minute,
            Some(s) if s <= Duration::days(1) => Granularity::Hour,
            Some(s) if s <= Duration::days(10_000) => Granularity::Day,
            _ => Granularity::Week,
        }
    }

    /// Start of the bucket containing `ts`. Weeks start on Monday.
    pub fn truncate(&self, ts: Timestamp) -> Timestamp {
        let date = ts.date();
        match self {
            Granularity::Minute => date
                .and_hms_opt(ts.hour(), ts.minute(), 0)
                .unwrap_or(ts),
            Granularity::Hour => date.and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts),
            Granularity::Day => date.and_time(NaiveTime::MIN),
            Granularity::Week => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                monday.and_time(NaiveTime::MIN)
            }
        }
    }

    pub fn step(&self) -> Duration {
        match self {
            Granularity::Minute => Duration::minutes(1),
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
            Granularity::Week => Duration::weeks(1),
        }
    }

    pub fn label(&self, bucket: Timestamp) -> String {
        let fmt = match self {
            Granularity::Minute => "%Y-%m-%d %H:%M",
            Granularity::Hour => "%Y-%m-%d %H:00",
            Granularity::Day | Granularity::Week => "%Y-%m-%d",
        };
        bucket.format(fmt).to_string()
    }
}

/// Whether empty buckets inside the window are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    #[default]
    None,
    Zero,
}

impl GapFill {
    pub fn from_params(params: &RequestParams) -> Result<Self, CoreError> {
        match params.get("fill") {
            None | Some("none") => Ok(GapFill::None),
            Some("zero") => Ok(GapFill::Zero),
            Some(other) => Err(CoreError::invalid(format!(
                "fill must be none or zero, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub start: Timestamp,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

/// Group `(timestamp, value)` pairs into buckets, summing values, in
/// chronological order.
///
/// With [`GapFill::Zero`] and known bounds, every bucket of `[from, to)` is
/// emitted; buckets outside the bounds are kept as they came.
pub fn bucketize(
    entries: impl IntoIterator<Item = (Timestamp, i64)>,
    granularity: Granularity,
    fill: GapFill,
    bounds: Option<(Timestamp, Timestamp)>,
) -> TimeSeries {
    let mut buckets: BTreeMap<NaiveDateTime, i64> = BTreeMap::new();
    for (ts, value) in entries {
        *buckets.entry(granularity.truncate(ts)).or_insert(0) += value;
    }

    if let (GapFill::Zero, Some((from, to))) = (fill, bounds) {
        let first = granularity.truncate(from);
        let step = granularity.step();
        let needed = ((to - first).num_seconds() / step.num_seconds().max(1)) as usize + 1;
        if needed <= MAX_FILLED_POINTS {
            let mut cursor = first;
            while cursor < to {
                buckets.entry(cursor).or_insert(0);
                cursor += step;
            }
        }
    }

    TimeSeries {
        granularity,
        points: buckets
            .into_iter()
            .map(|(start, value)| SeriesPoint {
                label: granularity.label(start),
                start,
                value,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn granularity_follows_span() {
        assert_eq!(Granularity::for_span(Some(Duration::minutes(60))), Granularity::Minute);
        assert_eq!(Granularity::for_span(Some(Duration::minutes(61))), Granularity::Hour);
        assert_eq!(Granularity::for_span(Some(Duration::days(1))), Granularity::Hour);
        assert_eq!(Granularity::for_span(Some(Duration::days(7))), Granularity::Day);
        assert_eq!(Granularity::for_span(Some(Duration::days(10_000))), Granularity::Day);
        assert_eq!(Granularity::for_span(Some(Duration::days(10_001))), Granularity::Week);
        assert_eq!(Granularity::for_span(None), Granularity::Week);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2009-02-05 is a Thursday.
        assert_eq!(
            Granularity::Week.truncate(ts("2009-02-05 17:42:10")),
            ts("2009-02-02 00:00:00")
        );
        assert_eq!(
            Granularity::Minute.truncate(ts("2009-02-05 17:42:10")),
            ts("2009-02-05 17:42:00")
        );
    }

    #[test]
    fn buckets_are_summed_and_ordered() {
        let s = bucketize(
            [
                (ts("2009-02-01 11:10:00"), 2),
                (ts("2009-02-01 10:59:59"), 1),
                (ts("2009-02-01 11:45:00"), 3),
            ],
            Granularity::Hour,
            GapFill::None,
            None,
        );
        let got: Vec<(&str, i64)> = s.points.iter().map(|p| (p.label.as_str(), p.value)).collect();
        assert_eq!(got, vec![("2009-02-01 10:00", 1), ("2009-02-01 11:00", 5)]);
    }

    #[test]
    fn zero_fill_covers_the_window() {
        let s = bucketize(
            [(ts("2009-02-01 12:30:00"), 4)],
            Granularity::Hour,
            GapFill::Zero,
            Some((ts("2009-02-01 10:15:00"), ts("2009-02-01 14:00:00"))),
        );
        let values: Vec<i64> = s.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0, 0, 4, 0]);
        assert_eq!(s.points[0].label, "2009-02-01 10:00");
    }

    #[test]
    fn without_fill_empty_buckets_are_absent() {
        let s = bucketize(
            [(ts("2009-02-01 12:30:00"), 4)],
            Granularity::Hour,
            GapFill::None,
            Some((ts("2009-02-01 10:00:00"), ts("2009-02-01 14:00:00"))),
        );
        assert_eq!(s.points.len(), 1);
    }

    #[test]
    fn oversized_fill_is_skipped() {
        let s = bucketize(
            [],
            Granularity::Minute,
            GapFill::Zero,
            Some((ts("2000-01-01 00:00:00"), ts("2009-01-01 00:00:00"))),
        );
        assert!(s.points.is_empty());
    }

    #[test]
    fn fill_parameter() {
        let p = RequestParams::from_pairs([("fill", "zero")]);
        assert_eq!(GapFill::from_params(&p).unwrap(), GapFill::Zero);
        let p = RequestParams::from_pairs([("fill", "linear")]);
        assert_matches!(GapFill::from_params(&p), Err(CoreError::InvalidInput(_)));
    }
}
