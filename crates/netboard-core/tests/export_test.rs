#![allow(clippy::unwrap_used)]

mod common;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use common::RecordingPlatform;
use netboard_api::{Timeseries, TimeseriesSample};
use netboard_core::export::aggregate::HOUR_MS;
use netboard_core::export::{self, DEFAULT_KEY, DEFAULT_START_MS};
use netboard_core::{EntityRef, ExportWindow};

fn series(samples: &[(i64, &str)]) -> Timeseries {
    let samples = samples
        .iter()
        .map(|(ts, value)| TimeseriesSample {
            ts: *ts,
            value: json!(value),
        })
        .collect();
    Timeseries::from([(DEFAULT_KEY.to_owned(), samples)])
}

fn four_hours() -> ExportWindow {
    ExportWindow::between(DEFAULT_START_MS, DEFAULT_START_MS + 4 * HOUR_MS)
}

#[tokio::test]
async fn exports_bulk_fallback_and_skips_empty_devices() {
    let window = four_hours();
    let start = window.start_ms;
    let mut platform = RecordingPlatform::default();
    platform.series.insert(
        ("AP1".into(), start),
        series(&[(start, "4.0"), (start + HOUR_MS, "4.5")]),
    );
    platform.series.insert(
        ("AP1".into(), window.mid_ms),
        series(&[(window.mid_ms, "5.0"), (window.mid_ms + HOUR_MS, "5.5")]),
    );
    platform
        .series
        .insert(("AP2".into(), start + HOUR_MS), series(&[(start + HOUR_MS, "7.0")]));

    let devices = [
        EntityRef::device("AP1"),
        EntityRef::device("AP2"),
        EntityRef::device("AP3"),
    ];
    let tmp = tempfile::tempdir().unwrap();

    let summary = export::run(&platform, &devices, &window, tmp.path()).await.unwrap();

    assert_eq!(summary.exported, 2);
    assert_eq!(summary.skipped, ["AP3"]);
    assert!(summary.daily.exists());
    assert!(summary.hourly.exists());

    let dumped: Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.json).unwrap()).unwrap();
    let rows = dumped.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["AP1"].as_array().unwrap().len(), 4);
    assert_eq!(rows[1]["AP2"], json!([{"ts": start + HOUR_MS, "value": "7.0"}]));

    let ap2_reads: Vec<String> = platform
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("read AP2"))
        .collect();
    assert_eq!(
        ap2_reads,
        [
            format!("read AP2 {start}"),
            format!("read AP2 {start}"),
            format!("read AP2 {}", start + HOUR_MS),
            format!("read AP2 {}", start + 2 * HOUR_MS),
            format!("read AP2 {}", start + 3 * HOUR_MS),
        ]
    );
}

#[tokio::test]
async fn second_half_failure_falls_back_to_hours() {
    let window = four_hours();
    let start = window.start_ms;
    let mut platform = RecordingPlatform::default();
    platform
        .series
        .insert(("AP1".into(), start), series(&[(start, "3.0")]));

    let samples = export::fetch_device(&platform, &EntityRef::device("AP1"), &window, DEFAULT_KEY).await;

    assert_eq!(samples.len(), 1);
    assert_eq!(platform.calls().len(), 2 + 4);
}

#[tokio::test]
async fn invalid_window_is_rejected_before_any_read() {
    let platform = RecordingPlatform::default();
    let tmp = tempfile::tempdir().unwrap();
    let window = ExportWindow {
        start_ms: 10,
        mid_ms: 5,
        end_ms: 20,
    };

    let result = export::run(&platform, &[EntityRef::device("AP1")], &window, tmp.path()).await;

    assert!(result.is_err());
    assert!(platform.calls().is_empty());
}
