//! Time-series bucketing and smoothing. Bucketed output is always
//! contiguous over the requested range: empty buckets are zero-filled,
//! never omitted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Count,
    Sum,
    Average,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub start: DateTime<Utc>,
    pub value: f64,
}

/// Bucket timestamped values into fixed intervals across
/// `[range_start, range_end]`, aggregating each bucket. The result covers
/// every interval touching the range, in order, with no gaps.
pub fn bucket_series(
    points: &[(DateTime<Utc>, f64)],
    interval: Interval,
    aggregate: Aggregate,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<TimeBucket> {
    if range_end < range_start {
        return Vec::new();
    }

    let mut buckets = Vec::new();
    let mut cursor = floor_to_interval(interval, range_start);
    let last = floor_to_interval(interval, range_end);
    while cursor <= last {
        let next = advance(interval, cursor);
        let members: Vec<f64> = points
            .iter()
            .filter(|(at, _)| {
                *at >= range_start && *at <= range_end && *at >= cursor && *at < next
            })
            .map(|(_, value)| *value)
            .collect();
        buckets.push(TimeBucket {
            start: cursor,
            value: aggregate_values(aggregate, &members),
        });
        cursor = next;
    }
    buckets
}

/// Trailing moving average with window `window`. The first `window - 1`
/// points average over the partial window of values seen so far, so output
/// length always equals input length.
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut smoothed = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let slice = &values[start..=i];
        smoothed.push(slice.iter().sum::<f64>() / slice.len() as f64);
    }
    smoothed
}

fn aggregate_values(aggregate: Aggregate, values: &[f64]) -> f64 {
    match aggregate {
        Aggregate::Count => values.len() as f64,
        Aggregate::Sum => values.iter().sum(),
        Aggregate::Average => {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
    }
}

fn floor_to_interval(interval: Interval, at: DateTime<Utc>) -> DateTime<Utc> {
    let date = at.date_naive();
    let floored = match interval {
        Interval::Daily => date,
        // Weeks start Monday.
        Interval::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        Interval::Monthly => first_of_month(date.year(), date.month()),
    };
    floored.and_time(NaiveTime::MIN).and_utc()
}

fn advance(interval: Interval, start: DateTime<Utc>) -> DateTime<Utc> {
    match interval {
        Interval::Daily => start + Duration::days(1),
        Interval::Weekly => start + Duration::days(7),
        Interval::Monthly => {
            let date = start.date_naive();
            let (year, month) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            first_of_month(year, month).and_time(NaiveTime::MIN).and_utc()
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is a valid date")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).single().expect("valid time")
    }

    #[test]
    fn daily_buckets_are_contiguous_and_zero_filled() {
        let points = vec![(at(1, 9), 2.0), (at(1, 17), 4.0), (at(4, 12), 6.0)];
        let buckets = bucket_series(&points, Interval::Daily, Aggregate::Count, at(1, 0), at(5, 0));

        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets[0].value, 2.0);
        assert_eq!(buckets[1].value, 0.0);
        assert_eq!(buckets[2].value, 0.0);
        assert_eq!(buckets[3].value, 1.0);
        assert_eq!(buckets[4].value, 0.0);
        for pair in buckets.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::days(1));
        }
    }

    #[test]
    fn sum_and_average_aggregation() {
        let points = vec![(at(1, 9), 2.0), (at(1, 17), 4.0)];
        let sum = bucket_series(&points, Interval::Daily, Aggregate::Sum, at(1, 0), at(2, 0));
        assert_eq!(sum[0].value, 6.0);
        let avg = bucket_series(&points, Interval::Daily, Aggregate::Average, at(1, 0), at(2, 0));
        assert_eq!(avg[0].value, 3.0);
        // Empty bucket averages to zero rather than NaN.
        assert_eq!(avg[1].value, 0.0);
    }

    #[test]
    fn weekly_buckets_anchor_on_monday() {
        // 2024-05-01 is a Wednesday; its week starts Monday 2024-04-29.
        let buckets = bucket_series(&[], Interval::Weekly, Aggregate::Count, at(1, 0), at(14, 0));
        let expected_start = Utc.with_ymd_and_hms(2024, 4, 29, 0, 0, 0).single().expect("valid");
        assert_eq!(buckets[0].start, expected_start);
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn monthly_buckets_roll_over_year_end() {
        let start = Utc.with_ymd_and_hms(2024, 11, 15, 0, 0, 0).single().expect("valid");
        let end = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).single().expect("valid");
        let buckets = bucket_series(&[], Interval::Monthly, Aggregate::Count, start, end);

        let starts: Vec<DateTime<Utc>> = buckets.iter().map(|b| b.start).collect();
        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).single().expect("valid"),
                Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).single().expect("valid"),
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("valid"),
            ]
        );
    }

    #[test]
    fn points_outside_the_range_are_excluded() {
        let points = vec![(at(1, 0), 1.0), (at(9, 0), 1.0)];
        let buckets = bucket_series(&points, Interval::Daily, Aggregate::Count, at(2, 0), at(8, 0));
        let total: f64 = buckets.iter().map(|b| b.value).sum();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let buckets = bucket_series(&[], Interval::Daily, Aggregate::Count, at(5, 0), at(1, 0));
        assert!(buckets.is_empty());
    }

    #[test]
    fn smoothing_keeps_output_length_with_partial_windows() {
        let smoothed = smooth(&[3.0, 6.0, 9.0], 7);
        assert_eq!(smoothed.len(), 3);
        assert_eq!(smoothed[0], 3.0);
        assert_eq!(smoothed[1], 4.5);
        assert_eq!(smoothed[2], 6.0);
    }

    #[test]
    fn smoothing_with_full_windows() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = smooth(&values, 3);
        assert_eq!(smoothed, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn smoothing_empty_input() {
        assert!(smooth(&[], 7).is_empty());
    }
}
