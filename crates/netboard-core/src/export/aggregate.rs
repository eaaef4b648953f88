// UTC day/hour bucketing of historical samples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use netboard_api::TimeseriesSample;
use tracing::debug;

pub const HOUR_MS: i64 = 3_600_000;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Hour,
}

impl Granularity {
    pub fn width_ms(self) -> i64 {
        match self {
            Self::Day => DAY_MS,
            Self::Hour => HOUR_MS,
        }
    }

    /// Start of the bucket containing `ts`.
    pub fn truncate(self, ts: i64) -> i64 {
        ts.div_euclid(self.width_ms()) * self.width_ms()
    }

    /// Column heading for a bucket.
    pub fn label(self, bucket: i64) -> String {
        let Some(at) = DateTime::<Utc>::from_timestamp_millis(bucket) else {
            return bucket.to_string();
        };
        match self {
            Self::Day => at.format("%Y-%m-%d").to_string(),
            Self::Hour => at.format("%Y-%m-%d %H:00").to_string(),
        }
    }

    /// Every bucket start overlapping `[start, end)`.
    pub fn buckets(self, start: i64, end: i64) -> Vec<i64> {
        let mut buckets = Vec::new();
        let mut bucket = self.truncate(start);
        while bucket < end {
            buckets.push(bucket);
            bucket += self.width_ms();
        }
        buckets
    }
}

/// Bucket start → summed value.
pub type Buckets = BTreeMap<i64, f64>;

/// Sum sample values per bucket. Non-numeric samples are dropped.
pub fn aggregate(samples: &[TimeseriesSample], granularity: Granularity) -> Buckets {
    let mut buckets = Buckets::new();
    for sample in samples {
        let Some(value) = sample.as_f64() else {
            debug!(ts = sample.ts, "non-numeric sample dropped");
            continue;
        };
        *buckets.entry(granularity.truncate(sample.ts)).or_default() += value;
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const APR_5_2023: i64 = 1_680_652_800_000;

    fn hourly(day_start: i64, value: &str) -> Vec<TimeseriesSample> {
        (0..24)
            .map(|h| TimeseriesSample {
                ts: day_start + h * HOUR_MS + 1_800_000,
                value: json!(value),
            })
            .collect()
    }

    #[test]
    fn day_sum_of_equal_hours() {
        let daily = aggregate(&hourly(APR_5_2023, "2.5"), Granularity::Day);
        assert_eq!(daily.len(), 1);
        assert!((daily[&APR_5_2023] - 24.0 * 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn hours_stay_separate() {
        let samples = hourly(APR_5_2023, "1");
        let by_hour = aggregate(&samples, Granularity::Hour);
        assert_eq!(by_hour.len(), 24);
        assert_eq!(by_hour.keys().next(), Some(&APR_5_2023));
    }

    #[test]
    fn garbage_values_are_ignored() {
        let samples = vec![
            TimeseriesSample {
                ts: APR_5_2023,
                value: json!("n/a"),
            },
            TimeseriesSample {
                ts: APR_5_2023,
                value: json!(3.0),
            },
        ];
        let daily = aggregate(&samples, Granularity::Day);
        assert!((daily[&APR_5_2023] - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn labels_are_utc() {
        assert_eq!(Granularity::Day.label(APR_5_2023), "2023-04-05");
        assert_eq!(
            Granularity::Hour.label(APR_5_2023 + 14 * HOUR_MS),
            "2023-04-05 14:00"
        );
    }

    #[test]
    fn two_week_window_buckets() {
        let (start, end) = (1_680_703_200_000, 1_681_912_800_000);
        assert_eq!(Granularity::Hour.buckets(start, end).len(), 336);
        // 14:00 start straddles fifteen calendar days.
        assert_eq!(Granularity::Day.buckets(start, end).len(), 15);
    }
}
