// ── Historical exporter ──
//
// Pulls a two-week window of hourly PoE averages per device, falling back
// to one request per hour when the bulk reads fail, and writes daily and
// hourly sums plus the raw samples.

pub mod aggregate;
pub mod writer;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use netboard_api::{Aggregation, TimeseriesSample};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::EntityRef;
use crate::platform::{Platform, TimeseriesQuery};
use aggregate::HOUR_MS;
pub use writer::{ExportFiles, ExportWriter, MAX_HOURLY_COLUMNS};

/// Wed Apr 05 2023 14:00:00 UTC.
pub const DEFAULT_START_MS: i64 = 1_680_703_200_000;
/// Wed Apr 12 2023 14:00:00 UTC.
pub const DEFAULT_MID_MS: i64 = 1_681_308_000_000;
/// Wed Apr 19 2023 14:00:00 UTC.
pub const DEFAULT_END_MS: i64 = 1_681_912_800_000;

pub const DEFAULT_KEY: &str = "PoE";
pub const QUERY_LIMIT: u32 = 10_000;

/// The read window, split in two for the bulk requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportWindow {
    pub start_ms: i64,
    pub mid_ms: i64,
    pub end_ms: i64,
}

impl Default for ExportWindow {
    fn default() -> Self {
        Self {
            start_ms: DEFAULT_START_MS,
            mid_ms: DEFAULT_MID_MS,
            end_ms: DEFAULT_END_MS,
        }
    }
}

impl ExportWindow {
    /// Window with the midpoint halfway between `start` and `end`.
    pub fn between(start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms,
            mid_ms: start_ms / 2 + end_ms / 2 + (start_ms % 2 + end_ms % 2) / 2,
            end_ms,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: String| Err(CoreError::Config { message });
        if !(self.start_ms < self.mid_ms && self.mid_ms < self.end_ms) {
            return invalid(format!(
                "export window must satisfy start < mid < end (got {} / {} / {})",
                self.start_ms, self.mid_ms, self.end_ms
            ));
        }
        for ms in [self.start_ms, self.end_ms] {
            if DateTime::<Utc>::from_timestamp_millis(ms).is_none() {
                return invalid(format!("export window bound {ms} is not a valid UTC timestamp"));
            }
        }
        let hours = self.hour_columns();
        if hours > i128::from(MAX_HOURLY_COLUMNS) {
            return invalid(format!(
                "export window spans {hours} hours; the hourly sheet holds at most {MAX_HOURLY_COLUMNS}"
            ));
        }
        Ok(())
    }

    /// Hour buckets the hourly sheet needs for this window.
    fn hour_columns(&self) -> i128 {
        let first = i128::from(self.start_ms.div_euclid(HOUR_MS)) * i128::from(HOUR_MS);
        let span = i128::from(self.end_ms) - first;
        (span + i128::from(HOUR_MS) - 1).div_euclid(i128::from(HOUR_MS))
    }

    /// `<start>-<end>` as UTC `%Y%m%dT%H%M%S`.
    pub fn tag(&self) -> String {
        let fmt = |ms: i64| {
            DateTime::<Utc>::from_timestamp_millis(ms)
                .map_or_else(|| ms.to_string(), |t| t.format("%Y%m%dT%H%M%S").to_string())
        };
        format!("{}-{}", fmt(self.start_ms), fmt(self.end_ms))
    }

    /// Hour-long sub-intervals covering the window. The last one ends at
    /// `end_ms` when the window is not a whole number of hours.
    pub fn hours(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let mut start = self.start_ms;
        std::iter::from_fn(move || {
            if start >= self.end_ms {
                return None;
            }
            let end = start.saturating_add(HOUR_MS).min(self.end_ms);
            let slot = (start, end);
            start = end;
            Some(slot)
        })
    }
}

/// Hourly averages of `key`.
pub fn hourly_query(key: &str, start_ms: i64, end_ms: i64) -> TimeseriesQuery {
    TimeseriesQuery {
        keys: vec![key.to_owned()],
        interval_ms: Some(3_600_000),
        limit: Some(QUERY_LIMIT),
        agg: Some(Aggregation::Avg),
        ..TimeseriesQuery::new(start_ms, end_ms)
    }
}

async fn read_key(
    platform: &dyn Platform,
    device: &EntityRef,
    query: &TimeseriesQuery,
    key: &str,
) -> Result<Vec<TimeseriesSample>, CoreError> {
    let mut series = platform.read_historical_values(device, query).await?;
    series.remove(key).ok_or_else(|| CoreError::Api {
        message: format!("no '{key}' values between {} and {}", query.start_ts, query.end_ts),
        status: None,
    })
}

/// Read a device's samples for the whole window.
///
/// Two bulk reads first; if either fails, one read per hour, keeping
/// whatever succeeds.
pub async fn fetch_device(
    platform: &dyn Platform,
    device: &EntityRef,
    window: &ExportWindow,
    key: &str,
) -> Vec<TimeseriesSample> {
    let first = read_key(platform, device, &hourly_query(key, window.start_ms, window.mid_ms), key).await;
    let second = match &first {
        Ok(_) => read_key(platform, device, &hourly_query(key, window.mid_ms, window.end_ms), key).await,
        Err(_) => Ok(Vec::new()),
    };
    match (first, second) {
        (Ok(mut samples), Ok(rest)) => {
            samples.extend(rest);
            return samples;
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(device = %device.name, error = %e, "bulk read failed, reading hour by hour");
        }
    }

    let mut samples = Vec::new();
    for (start, end) in window.hours() {
        match read_key(platform, device, &hourly_query(key, start, end), key).await {
            Ok(hour) => samples.extend(hour),
            Err(e) => warn!(device = %device.name, start, end, error = %e, "hour read failed"),
        }
    }
    samples
}

/// Outcome of an export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub exported: usize,
    pub skipped: Vec<String>,
    pub json: PathBuf,
    pub daily: PathBuf,
    pub hourly: PathBuf,
}

/// Export every device into `out_dir`.
///
/// Devices without samples are skipped; a failure to write one device's
/// row is logged and that device is skipped too.
pub async fn run(
    platform: &dyn Platform,
    devices: &[EntityRef],
    window: &ExportWindow,
    out_dir: impl Into<PathBuf>,
) -> Result<ExportSummary, CoreError> {
    window.validate()?;
    let out_dir = out_dir.into();
    tokio::fs::create_dir_all(&out_dir)
        .await
        .map_err(|e| CoreError::io(&out_dir, e))?;

    let files = ExportFiles::in_dir(&out_dir, DEFAULT_KEY, window);
    let mut writer = ExportWriter::create(files, window)?;
    let mut skipped = Vec::new();

    for (i, device) in devices.iter().enumerate() {
        info!(index = i, device = %device.name, "exporting");
        let samples = fetch_device(platform, device, window, DEFAULT_KEY).await;
        if samples.is_empty() {
            warn!(device = %device.name, "no data for this device, skipping");
            skipped.push(device.name.clone());
            continue;
        }
        if let Err(e) = writer.add_device(&device.name, &samples) {
            warn!(device = %device.name, error = %e, "cannot export device");
            skipped.push(device.name.clone());
        }
    }

    let exported = writer.rows();
    let files = writer.finish()?;
    info!(exported, skipped = skipped.len(), daily = %files.daily.display(), "export finished");
    Ok(ExportSummary {
        exported,
        skipped,
        json: files.json,
        daily: files.daily,
        hourly: files.hourly,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_window_tag() {
        assert_eq!(
            ExportWindow::default().tag(),
            "20230405T140000-20230419T140000"
        );
    }

    #[test]
    fn hours_cover_window() {
        let window = ExportWindow::default();
        let hours: Vec<_> = window.hours().collect();
        assert_eq!(hours.len(), 336);
        assert_eq!(hours[0], (DEFAULT_START_MS, DEFAULT_START_MS + HOUR_MS));
        assert_eq!(hours.last().map(|h| h.1), Some(DEFAULT_END_MS));
    }

    #[test]
    fn query_uses_hourly_averages() {
        let query = hourly_query("PoE", 1, 2);
        assert_eq!(query.interval_ms, Some(3_600_000));
        assert_eq!(query.limit, Some(10_000));
        assert_eq!(query.agg, Some(Aggregation::Avg));
        assert_eq!(query.keys, ["PoE"]);
    }

    #[test]
    fn partial_last_hour_stops_at_window_end() {
        let window = ExportWindow::between(0, 2 * HOUR_MS + 600_000);
        let hours: Vec<_> = window.hours().collect();
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[2], (2 * HOUR_MS, 2 * HOUR_MS + 600_000));
    }

    #[test]
    fn window_validation() {
        assert!(ExportWindow::default().validate().is_ok());
        assert!(ExportWindow::between(10, 10).validate().is_err());
        assert_eq!(ExportWindow::between(0, 10).mid_ms, 5);
        assert_eq!(ExportWindow::between(-7, 7).mid_ms, 0);
    }

    #[test]
    fn extreme_bounds_are_rejected_without_overflow() {
        let window = ExportWindow::between(-1, i64::MAX);
        assert!(window.start_ms < window.mid_ms && window.mid_ms < window.end_ms);
        assert!(window.validate().is_err());
        assert!(ExportWindow::between(i64::MIN, i64::MAX).validate().is_err());
    }

    #[test]
    fn window_must_fit_the_hourly_sheet() {
        let limit = i64::from(MAX_HOURLY_COLUMNS);
        let widest = ExportWindow::between(DEFAULT_START_MS, DEFAULT_START_MS + limit * HOUR_MS);
        assert!(widest.validate().is_ok());

        let two_years = ExportWindow::between(DEFAULT_START_MS, DEFAULT_START_MS + 730 * 24 * HOUR_MS);
        let err = two_years.validate().unwrap_err();
        assert!(err.to_string().contains("hourly sheet"));
    }

    #[test]
    fn widest_window_still_creates_the_workbooks() {
        let tmp = tempfile::tempdir().unwrap();
        let limit = i64::from(MAX_HOURLY_COLUMNS);
        let window = ExportWindow::between(DEFAULT_START_MS, DEFAULT_START_MS + limit * HOUR_MS);
        let files = ExportFiles::in_dir(tmp.path(), DEFAULT_KEY, &window);
        assert!(ExportWriter::create(files, &window).is_ok());
    }
}
