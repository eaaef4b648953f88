// Live switch onboarding.
//
// Stack members are discovered from `show version` on each testbed device
// (`<device>_<member>`), created as switch devices, related to the zones
// named for their stack in the switches file, and announced to the MQTT
// gateway together with their inventory attributes.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{OnboardReport, relate_to_parents};
use crate::cdp::ap_neighbors;
use crate::collect::DeviceCollector;
use crate::error::CoreError;
use crate::model::{DeviceType, Entity};
use crate::platform::{Outcome, Platform};
use crate::stream::GatewayPublisher;
use netboard_api::{ATTRIBUTES_TOPIC, CONNECT_TOPIC};

pub const VERSION_COMMAND: &str = "show version";

/// Pause after each gateway announcement.
pub const ANNOUNCE_SETTLE: Duration = Duration::from_secs(2);

/// Build one switch device per stack member found in parsed `show version`.
pub fn stack_members(device: &str, address: Option<&str>, show_version: &Value) -> Vec<Entity> {
    let Some(version) = show_version.get("version") else {
        warn!(device, "no version section in show version output");
        return Vec::new();
    };
    let Some(members) = version.get("switch_num").and_then(Value::as_object) else {
        warn!(device, "no stack members in show version output");
        return Vec::new();
    };

    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_owned);
    members
        .iter()
        .map(|(member, info)| {
            let mut switch = Entity::device(format!("{device}_{member}"), DeviceType::Switch);
            let attributes = [
                ("serial", text(version, "chassis_sn")),
                ("os", text(version, "os")),
                ("address", address.map(str::to_owned)),
                ("version", text(version, "version")),
                ("mac-address", text(info, "mac_address")),
                ("model", text(info, "model")),
            ];
            for (key, value) in attributes {
                match value {
                    Some(value) => switch.add_attribute(key, value),
                    None => debug!(device = %switch.name, key, "attribute unavailable"),
                }
            }
            switch
        })
        .collect()
}

/// Poll every testbed device and return its stack members, sorted by name.
pub async fn discover(collector: &dyn DeviceCollector, workers: usize) -> Vec<Entity> {
    let devices = collector.devices();
    info!(devices = devices.len(), "discovering switch stacks");
    let found: Vec<Vec<Entity>> = stream::iter(devices)
        .map(|device| async move {
            let mut session = match collector.connect(&device).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(device, error = %e, "cannot connect to switch");
                    return Vec::new();
                }
            };
            let members = match session.parse(VERSION_COMMAND).await {
                Ok(parsed) => {
                    let address = collector.address(&device);
                    stack_members(&device, address.as_deref(), &parsed)
                }
                Err(e) => {
                    warn!(device, error = %e, "show version failed");
                    Vec::new()
                }
            };
            match session.parse(crate::stream::switches::CDP_COMMAND).await {
                Ok(cdp) => debug!(device, aps = ap_neighbors(&cdp).len(), "CDP neighbors"),
                Err(e) => debug!(device, error = %e, "CDP neighbors unavailable"),
            }
            session.disconnect().await;
            members
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut members: Vec<Entity> = found.into_iter().flatten().collect();
    members.sort_by(|a, b| a.name.cmp(&b.name));
    info!(members = members.len(), "discovered stack members");
    members
}

/// Switches-file records whose name plus `_` prefixes the member name.
fn matching_records<'a>(member: &'a str, records: &'a [Entity]) -> impl Iterator<Item = &'a Entity> {
    records
        .iter()
        .filter(move |r| member.starts_with(&format!("{}_", r.name)))
}

async fn announce(publisher: &dyn GatewayPublisher, topic: &str, payload: &Value) -> Result<Outcome, CoreError> {
    let result = publisher.publish(topic, payload).await;
    tokio::time::sleep(ANNOUNCE_SETTLE).await;
    result.map(|()| Outcome::Created)
}

/// Onboard discovered stack members.
///
/// `switch_records` are the switches-file devices whose zone parents are
/// reused for matching members. Without a publisher the gateway
/// announcements are skipped.
pub async fn onboard_switches(
    platform: &dyn Platform,
    publisher: Option<&dyn GatewayPublisher>,
    customer: Option<&str>,
    switch_records: &[Entity],
    members: &[Entity],
) -> Result<OnboardReport, CoreError> {
    let mut report = OnboardReport::default();
    let customer_id = match customer {
        Some(name) => Some(platform.customer_id(name).await?),
        None => {
            warn!("no customer configured; assignments will be skipped");
            None
        }
    };

    for member in members {
        report.record("create device", &member.name, platform.create_device(member).await);
        let result = platform
            .assign_to_customer(&member.to_ref(), customer_id)
            .await;
        report.record("assign device", &member.name, result);

        for record in matching_records(&member.name, switch_records) {
            let mut related = record.clone();
            related.name.clone_from(&member.name);
            relate_to_parents(platform, &related, &mut report).await;
        }

        let Some(publisher) = publisher else {
            report.record("announce device", &member.name, Ok(Outcome::Skipped));
            continue;
        };
        info!(device = %member.name, "announcing to gateway");
        let result = announce(publisher, CONNECT_TOPIC, &json!({ "device": member.name })).await;
        report.record("announce device", &member.name, result);

        let mut attributes = serde_json::Map::new();
        attributes.insert(member.name.clone(), json!(member.attributes));
        let result = announce(publisher, ATTRIBUTES_TOPIC, &Value::Object(attributes)).await;
        report.record("publish attributes", &member.name, result);
    }

    info!(
        created = report.created,
        failed = report.failures.len(),
        "switch onboarding finished"
    );
    Ok(report)
}
