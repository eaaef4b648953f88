// ── Telemetry records ──
//
// Gateway telemetry payloads are keyed by device name:
// `{"SW1_1": [{"ts": 1680703200000, "values": {"used": 42.0}}]}`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Milliseconds since the Unix epoch, as the platform expects.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Metric values sampled at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub ts: i64,
    pub values: Map<String, Value>,
}

impl TelemetryPoint {
    pub fn new(ts: i64) -> Self {
        Self {
            ts,
            values: Map::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}

/// One publish worth of telemetry for one or more devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord(BTreeMap<String, Vec<TelemetryPoint>>);

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record carrying one device with one point.
    pub fn single(device: impl Into<String>, point: TelemetryPoint) -> Self {
        let mut record = Self::new();
        record.push(device, point);
        record
    }

    pub fn push(&mut self, device: impl Into<String>, point: TelemetryPoint) {
        self.0.entry(device.into()).or_default().push(point);
    }

    /// Register a device with no points (poll produced nothing).
    pub fn ensure_device(&mut self, device: impl Into<String>) {
        self.0.entry(device.into()).or_default();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn points(&self, device: &str) -> &[TelemetryPoint] {
        self.0.get(device).map(Vec::as_slice).unwrap_or_default()
    }

    /// Render as the gateway telemetry payload.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
