// Switch environment and PoE streamer.
//
// Every round polls each switch for environment and inline-power data,
// saves the per-interface PoE detail (and, in the first round, the CDP
// table) for the AP streamer, and emits one record per switch keyed by
// stack member (`<switch>_<member>`).

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Cadence, TelemetrySink, deliver_round, run_rounds};
use crate::collect::{CollectError, DeviceCollector, DeviceSession, SnapshotStore};
use crate::model::{TelemetryPoint, TelemetryRecord, now_ms};

pub const ENVIRONMENT_COMMAND: &str = "show env all";
pub const POWER_INLINE_COMMAND: &str = "show power inline";
pub const CDP_COMMAND: &str = "show cdp neighbors";

/// `show power inline <interface> detail`
pub fn power_detail_command(interface: &str) -> String {
    format!("show power inline {interface} detail")
}

/// Raw parsed output gathered from one switch in one round.
#[derive(Debug, Clone, Default)]
pub struct SwitchSample {
    pub device: String,
    pub ts: i64,
    pub environment: Value,
    pub power_inline: Value,
}

pub struct SwitchStreamer {
    collector: Arc<dyn DeviceCollector>,
    snapshots: SnapshotStore,
    workers: usize,
}

impl SwitchStreamer {
    pub fn new(collector: Arc<dyn DeviceCollector>, snapshots: SnapshotStore, workers: usize) -> Self {
        Self {
            collector,
            snapshots,
            workers: workers.max(1),
        }
    }

    /// Poll every device once. Devices that fail contribute nothing.
    pub async fn collect_round(&self, sample_cdp: bool) -> Vec<TelemetryRecord> {
        let devices = self.collector.devices();
        info!(devices = devices.len(), sample_cdp, "polling switches");
        stream::iter(devices)
            .map(|device| async move {
                let sample = self.poll(&device, sample_cdp).await?;
                Some(transform(&sample))
            })
            .buffer_unordered(self.workers)
            .filter_map(|record| async move { record.filter(|r| !r.is_empty()) })
            .collect()
            .await
    }

    /// Stream until cancelled. CDP is sampled in the first round only.
    pub async fn run(&self, sink: &dyn TelemetrySink, cadence: Cadence, cancel: &CancellationToken) -> u64 {
        run_rounds(cancel, cadence, |round| async move {
            let records = self.collect_round(round == 0).await;
            deliver_round(sink, &records).await;
        })
        .await
    }

    async fn poll(&self, device: &str, sample_cdp: bool) -> Option<SwitchSample> {
        let mut session = match self.collector.connect(device).await {
            Ok(session) => session,
            Err(e) => {
                warn!(device, error = %e, "cannot connect to switch");
                return None;
            }
        };

        let ts = now_ms();
        let environment = parse_or_null(session.as_mut(), ENVIRONMENT_COMMAND).await;
        let power_inline = parse_or_null(session.as_mut(), POWER_INLINE_COMMAND).await;

        let interfaces: Vec<String> = power_inline
            .get("interface")
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        for interface in &interfaces {
            let command = power_detail_command(interface);
            let detail = match session.parse(&command).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(device, command, error = %e, "power detail unavailable");
                    Value::Object(Map::new())
                }
            };
            if let Err(e) = self.snapshots.replace_json(device, &command, ts, &detail).await {
                warn!(device, command, error = %e, "cannot save power detail");
            }
        }

        if sample_cdp {
            match session.parse(CDP_COMMAND).await {
                Ok(cdp) => {
                    if let Err(e) = self.snapshots.save_json(device, CDP_COMMAND, ts, &cdp).await {
                        warn!(device, error = %e, "cannot save CDP neighbors");
                    }
                }
                Err(e) => warn!(device, error = %e, "CDP neighbors unavailable"),
            }
        }

        session.disconnect().await;
        Some(SwitchSample {
            device: device.to_owned(),
            ts,
            environment,
            power_inline,
        })
    }
}

async fn parse_or_null(session: &mut dyn DeviceSession, command: &str) -> Value {
    match session.parse(command).await {
        Ok(value) => value,
        Err(CollectError::ParserNotFound { .. }) => {
            warn!(device = session.device(), command, "no parser found");
            Value::Null
        }
        Err(e) => {
            warn!(device = session.device(), command, error = %e, "parse failed");
            Value::Null
        }
    }
}

/// Number or numeric string.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| number(value).map(|f| f.trunc() as i64))
}

/// Flatten one switch sample into a record keyed by stack member.
pub fn transform(sample: &SwitchSample) -> TelemetryRecord {
    let mut record = TelemetryRecord::new();
    let Some(members) = sample
        .environment
        .get("switch")
        .and_then(Value::as_object)
    else {
        warn!(device = %sample.device, "no stack members in environment output");
        return record;
    };

    for (member, env) in members {
        let name = format!("{}_{member}", sample.device);
        debug!(device = %name, "transforming");
        let mut point = TelemetryPoint::new(sample.ts);
        environment_values(&name, env, &mut point);
        power_values(&name, member, &sample.power_inline, &mut point);
        record.push(name, point);
    }
    record
}

fn environment_values(name: &str, env: &Value, point: &mut TelemetryPoint) {
    match env.get("fan").and_then(Value::as_object) {
        Some(fans) => {
            for (fan, state) in fans {
                if let Some(state) = state.get("state") {
                    point.insert(format!("fan_{fan}_state"), state.clone());
                }
            }
        }
        None => warn!(device = name, "no fan information"),
    }

    for key in ["hotspot_temperature", "inlet_temperature", "outlet_temperature"] {
        match env.get(key).and_then(|t| t.get("value")).and_then(number) {
            Some(celsius) => point.insert(key, celsius),
            None => warn!(device = name, key, "no temperature information"),
        }
    }
}

fn power_values(name: &str, member: &str, power_inline: &Value, point: &mut TelemetryPoint) {
    let has_output = power_inline.as_object().is_some_and(|m| !m.is_empty());
    if !has_output {
        point.insert("total_interfaces_power", 0);
        return;
    }

    match power_inline.get("watts").and_then(|w| w.get(member)) {
        Some(watts) => {
            for (field, key) in [
                ("available", "watts_available"),
                ("remaining", "watts_remaining"),
                ("used", "used"),
            ] {
                if let Some(v) = watts.get(field).and_then(integer) {
                    point.insert(key, v);
                }
            }
        }
        None => warn!(device = name, "no inline power budget"),
    }

    let marker = format!("{member}/0/");
    let mut total = 0i64;
    if let Some(interfaces) = power_inline.get("interface").and_then(Value::as_object) {
        for (intf, data) in interfaces.iter().filter(|(intf, _)| intf.contains(&marker)) {
            if let Some(state) = data.get("oper_state") {
                point.insert(format!("{intf}_oper_state"), state.clone());
            }
            let power = data.get("power").and_then(integer).unwrap_or_default();
            point.insert(format!("{intf}_power"), power);
            point.insert(
                format!("{intf}_device"),
                data.get("device").cloned().unwrap_or(Value::Null),
            );
            total += power;
        }
    }
    point.insert("total_interfaces_power", total);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SwitchSample {
        SwitchSample {
            device: "SW1".into(),
            ts: 1_680_703_200_000,
            environment: json!({"switch": {
                "1": {
                    "fan": {"1": {"state": "ok"}, "2": {"state": "ok"}},
                    "hotspot_temperature": {"value": "45"},
                    "inlet_temperature": {"value": "28"},
                    "outlet_temperature": {"value": "36"}
                },
                "2": {"fan": {"1": {"state": "bad"}}}
            }}),
            power_inline: json!({
                "watts": {
                    "1": {"available": 740.0, "used": 30.8, "remaining": 709.2},
                    "2": {"available": 740.0, "used": 0.0, "remaining": 740.0}
                },
                "interface": {
                    "GigabitEthernet1/0/1": {"oper_state": "on", "power": 15.4, "device": "C9120AXI-E"},
                    "GigabitEthernet1/0/2": {"oper_state": "on", "power": 15.4},
                    "GigabitEthernet2/0/1": {"oper_state": "off", "power": 0.0}
                }
            }),
        }
    }

    #[test]
    fn flattens_each_stack_member() {
        let record = transform(&sample());
        assert_eq!(record.devices().collect::<Vec<_>>(), ["SW1_1", "SW1_2"]);

        let values = &record.points("SW1_1")[0].values;
        assert_eq!(values["fan_1_state"], "ok");
        assert_eq!(values["hotspot_temperature"], 45.0);
        assert_eq!(values["watts_available"], 740);
        assert_eq!(values["used"], 30);
        assert_eq!(values["GigabitEthernet1/0/1_power"], 15);
        assert_eq!(values["GigabitEthernet1/0/1_device"], "C9120AXI-E");
        assert_eq!(values["GigabitEthernet1/0/2_device"], Value::Null);
        assert_eq!(values["total_interfaces_power"], 30);
        assert!(!values.contains_key("GigabitEthernet2/0/1_power"));
    }

    #[test]
    fn missing_temperatures_are_omitted() {
        let record = transform(&sample());
        let values = &record.points("SW1_2")[0].values;
        assert_eq!(values["fan_1_state"], "bad");
        assert!(!values.contains_key("inlet_temperature"));
        assert_eq!(values["GigabitEthernet2/0/1_oper_state"], "off");
        assert_eq!(values["total_interfaces_power"], 0);
    }

    #[test]
    fn empty_power_output_reports_zero() {
        let mut sample = sample();
        sample.power_inline = json!({});
        let record = transform(&sample);
        let values = &record.points("SW1_1")[0].values;
        assert_eq!(values["total_interfaces_power"], 0);
        assert!(!values.contains_key("watts_available"));
    }

    #[test]
    fn no_environment_means_no_record() {
        let mut sample = sample();
        sample.environment = Value::Null;
        assert!(transform(&sample).is_empty());
    }

    #[test]
    fn power_detail_command_embeds_interface() {
        assert_eq!(
            power_detail_command("Gi1/0/3"),
            "show power inline Gi1/0/3 detail"
        );
    }
}
