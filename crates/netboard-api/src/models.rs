// Wire types for the platform REST API.
//
// Only the fields netboard reads are modelled; everything else in the
// platform's responses is ignored by serde.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse entity class as understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Asset,
    Device,
    Customer,
}

impl EntityType {
    /// Lower-case path segment (`/tenant/assets`, `/customer/{id}/device/{id}`).
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Device => "device",
            Self::Customer => "customer",
        }
    }

    /// Upper-case form used inside relation and telemetry bodies.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Device => "DEVICE",
            Self::Customer => "CUSTOMER",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

/// `{"id": "...", "entityType": "ASSET"}` as embedded in every entity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityIdRef {
    pub id: Uuid,
    pub entity_type: String,
}

/// Any named platform entity (asset, device, customer).
///
/// Customers carry `title` instead of `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformEntity {
    pub id: EntityIdRef,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl PlatformEntity {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }
}

// ── Telemetry ───────────────────────────────────────────────────────

/// One historical data point. The platform reports values as strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeseriesSample {
    pub ts: i64,
    pub value: serde_json::Value,
}

impl TimeseriesSample {
    /// Numeric value, accepting both `"12.5"` and `12.5`.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Historical values keyed by telemetry key.
pub type Timeseries = BTreeMap<String, Vec<TimeseriesSample>>;

/// Server-side aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    None,
    Avg,
    Min,
    Max,
    Sum,
    Count,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
        }
    }
}

/// Filters for `/plugins/telemetry/DEVICE/{id}/values/timeseries`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesQuery {
    pub start_ts: i64,
    pub end_ts: i64,
    pub keys: Vec<String>,
    pub interval_ms: Option<u64>,
    pub limit: Option<u32>,
    pub agg: Option<Aggregation>,
}

impl TimeseriesQuery {
    pub fn new(start_ts: i64, end_ts: i64) -> Self {
        Self {
            start_ts,
            end_ts,
            keys: Vec::new(),
            interval_ms: None,
            limit: None,
            agg: None,
        }
    }

    /// Same filters over a different window.
    pub fn with_window(&self, start_ts: i64, end_ts: i64) -> Self {
        Self {
            start_ts,
            end_ts,
            ..self.clone()
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startTs", self.start_ts.to_string()),
            ("endTs", self.end_ts.to_string()),
        ];
        if let Some(interval) = self.interval_ms {
            pairs.push(("interval", interval.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(agg) = self.agg {
            pairs.push(("agg", agg.as_str().to_owned()));
        }
        if !self.keys.is_empty() {
            pairs.push(("keys", self.keys.join(",")));
        }
        pairs
    }
}

// ── Gateway credentials ─────────────────────────────────────────────

/// MQTT basic credentials attached to a gateway device.
#[derive(Debug, Clone)]
pub struct GatewayCredentials {
    pub username: String,
    pub password: SecretString,
}
