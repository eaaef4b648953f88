// ── Onboarding orchestrator ──
//
// Builds the full topology from configuration records, then materialises it
// on the platform in dependency order: customer, gateway, assets,
// asset assignment, site→zone edges, devices, device assignment and
// zone→device edges. A failed step is recorded and the run moves on; only
// an unresolvable configured customer aborts.

pub mod online;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::error::CoreError;
use crate::model::{AssetType, DeviceType, Entity, EntityId, EntityRef};
use crate::platform::{GatewayCredentials, Outcome, Platform};
use crate::topology::{BuildTarget, TopologyRecord, build_entity};

/// Parent relation keys that never produce a `Contains` edge to a device.
pub const UNRELATED_PARENT_KEYS: [&str; 2] = ["site", "switch"];

/// Prefix of the gateway device name; the customer name follows.
pub const GATEWAY_PREFIX: &str = "MQTT-gateway";

/// Everything read from configuration that feeds one onboarding run.
#[derive(Debug, Clone, Default)]
pub struct TopologyInput {
    pub customer: Option<String>,
    /// Broker credentials for the gateway device, when configured.
    pub gateway_credentials: Option<GatewayCredentials>,
    pub sites: Vec<TopologyRecord>,
    pub zones: Vec<TopologyRecord>,
    pub aps: Vec<TopologyRecord>,
    pub switches: Vec<TopologyRecord>,
}

/// A record the builder refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    pub name: String,
    pub reason: String,
}

/// The built entity graph for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    pub customer: Option<Entity>,
    pub gateway: Option<Entity>,
    #[serde(skip)]
    pub gateway_credentials: Option<GatewayCredentials>,
    pub sites: Vec<Entity>,
    pub zones: Vec<Entity>,
    pub aps: Vec<Entity>,
    pub switches: Vec<Entity>,
    pub rejected: Vec<Rejected>,
}

impl Topology {
    /// Build every record, honouring the run mode for device branches.
    pub async fn build(input: TopologyInput, ctx: &RunContext) -> Self {
        let mut topology = Topology {
            customer: input.customer.as_deref().map(Entity::customer),
            ..Topology::default()
        };

        if let Some(credentials) = input.gateway_credentials {
            let name = match input.customer.as_deref() {
                Some(customer) => format!("{GATEWAY_PREFIX}-{customer}"),
                None => GATEWAY_PREFIX.to_owned(),
            };
            topology.gateway = Some(Entity::device(name, DeviceType::Gateway));
            topology.gateway_credentials = Some(credentials);
        }

        topology.sites = topology
            .build_branch(&input.sites, BuildTarget::Asset(AssetType::Site), ctx.workers)
            .await;
        topology.zones = topology
            .build_branch(&input.zones, BuildTarget::Asset(AssetType::Zone), ctx.workers)
            .await;

        if ctx.mode.onboards_aps() {
            topology.aps = topology
                .build_branch(&input.aps, BuildTarget::Device(DeviceType::Ap), ctx.workers)
                .await;
        } else {
            info!("AP onboarding disabled for this run mode");
        }
        if ctx.mode.onboards_switches() {
            topology.switches = topology
                .build_branch(&input.switches, BuildTarget::Device(DeviceType::Switch), ctx.workers)
                .await;
        }

        info!(
            sites = topology.sites.len(),
            zones = topology.zones.len(),
            aps = topology.aps.len(),
            switches = topology.switches.len(),
            rejected = topology.rejected.len(),
            "built topology"
        );
        topology
    }

    async fn build_branch(
        &mut self,
        records: &[TopologyRecord],
        target: BuildTarget,
        workers: usize,
    ) -> Vec<Entity> {
        let results: Vec<_> = stream::iter(records)
            .map(|record| async move { (record.name().to_owned(), build_entity(record, target)) })
            .buffered(workers.max(1))
            .collect()
            .await;

        let mut built = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(entity) => built.push(entity),
                Err(e) => {
                    warn!(name, error = %e, "rejected topology record");
                    self.rejected.push(Rejected {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        built
    }

    pub fn assets(&self) -> impl Iterator<Item = &Entity> {
        self.sites.iter().chain(&self.zones)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Entity> {
        self.aps.iter().chain(&self.switches)
    }
}

/// A step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub operation: String,
    pub target: String,
    pub reason: String,
}

/// Tally of every platform operation in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnboardReport {
    pub created: usize,
    pub already_existed: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
}

impl OnboardReport {
    pub fn record(&mut self, operation: &str, target: &str, result: Result<Outcome, CoreError>) {
        match result {
            Ok(Outcome::Created) => self.created += 1,
            Ok(Outcome::AlreadyExists) => self.already_existed += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(e) => {
                error!(operation, target, error = %e, "onboarding step failed");
                self.failures.push(Failure {
                    operation: operation.to_owned(),
                    target: target.to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }

    pub fn merge(&mut self, other: OnboardReport) {
        self.created += other.created;
        self.already_existed += other.already_existed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create the customer (if configured) and resolve its ID.
///
/// A configured customer whose ID cannot be resolved is fatal.
pub async fn ensure_customer(
    platform: &dyn Platform,
    customer: Option<&Entity>,
    report: &mut OnboardReport,
) -> Result<Option<EntityId>, CoreError> {
    let Some(customer) = customer else {
        warn!("no customer configured; assignments will be skipped");
        return Ok(None);
    };
    report.record(
        "create customer",
        &customer.name,
        platform.create_customer(customer).await,
    );
    let id = platform.customer_id(&customer.name).await?;
    info!(customer = %customer.name, %id, "customer ready");
    Ok(Some(id))
}

/// Relate a device to every parent asset except sites and switches.
pub async fn relate_to_parents(
    platform: &dyn Platform,
    device: &Entity,
    report: &mut OnboardReport,
) {
    let child = device.to_ref();
    for (key, parent) in &device.parents {
        if UNRELATED_PARENT_KEYS.contains(&key.as_str()) {
            continue;
        }
        let result = platform
            .create_relation(&EntityRef::asset(parent.clone()), &child)
            .await;
        report.record("create relation", &format!("{parent} -> {}", device.name), result);
    }
}

/// Materialise a built topology on the platform.
pub async fn onboard(platform: &dyn Platform, topology: &Topology) -> Result<OnboardReport, CoreError> {
    let mut report = OnboardReport::default();

    let customer_id = ensure_customer(platform, topology.customer.as_ref(), &mut report).await?;

    if let (Some(gateway), Some(credentials)) = (&topology.gateway, &topology.gateway_credentials) {
        let result = platform.create_gateway(gateway, credentials).await;
        report.record("create gateway", &gateway.name, result);
    }

    for asset in topology.assets() {
        report.record("create asset", &asset.name, platform.create_asset(asset).await);
    }
    for asset in topology.assets() {
        let result = platform.assign_to_customer(&asset.to_ref(), customer_id).await;
        report.record("assign asset", &asset.name, result);
    }

    for site in &topology.sites {
        for child in site.children.keys() {
            let result = platform
                .create_relation(&site.to_ref(), &EntityRef::asset(child.clone()))
                .await;
            report.record("create relation", &format!("{} -> {child}", site.name), result);
        }
    }

    for ap in &topology.aps {
        report.record("create device", &ap.name, platform.create_device(ap).await);
        let result = platform.save_device_attributes(ap).await;
        report.record("save attributes", &ap.name, result);
    }
    for switch in &topology.switches {
        report.record("create device", &switch.name, platform.create_device(switch).await);
    }

    for device in topology.devices() {
        let result = platform.assign_to_customer(&device.to_ref(), customer_id).await;
        report.record("assign device", &device.name, result);
    }
    for device in topology.devices() {
        relate_to_parents(platform, device, &mut report).await;
    }

    info!(
        created = report.created,
        already_existed = report.already_existed,
        skipped = report.skipped,
        failed = report.failures.len(),
        "onboarding finished"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::RunMode;
    use crate::topology::{AssociationRecord, DeviceRecord};
    use indexmap::IndexMap;

    fn association(name: &str, key: &str, child: &str) -> TopologyRecord {
        let mut map_value = IndexMap::new();
        map_value.insert(key.to_owned(), child.to_owned());
        TopologyRecord::Association(AssociationRecord {
            map_key: name.into(),
            map_value,
        })
    }

    fn device(name: &str) -> TopologyRecord {
        TopologyRecord::Device(DeviceRecord::new(name, IndexMap::new()))
    }

    fn input() -> TopologyInput {
        TopologyInput {
            customer: Some("Acme".into()),
            sites: vec![association("S1", "zone", "Z1")],
            zones: vec![association("Z1", "area", "A1"), device("bogus")],
            aps: vec![device("AP1")],
            switches: vec![device("SW1")],
            ..TopologyInput::default()
        }
    }

    #[tokio::test]
    async fn default_mode_builds_aps_but_not_switches() {
        let topology = Topology::build(input(), &RunContext::default()).await;
        assert_eq!(topology.customer.as_ref().unwrap().name, "Acme");
        assert_eq!(topology.sites.len(), 1);
        assert_eq!(topology.zones.len(), 1);
        assert_eq!(topology.aps.len(), 1);
        assert!(topology.switches.is_empty());
        assert_eq!(topology.rejected.len(), 1);
        assert_eq!(topology.rejected[0].name, "bogus");
        assert!(topology.gateway.is_none());
    }

    #[tokio::test]
    async fn offline_mode_builds_switches() {
        let mode = RunMode {
            offline: true,
            aps_only: false,
            dry_run: false,
        };
        let topology = Topology::build(input(), &RunContext::new(mode, 2)).await;
        assert_eq!(topology.switches.len(), 1);
        assert_eq!(topology.devices().count(), 2);
    }

    #[tokio::test]
    async fn gateway_is_named_after_customer() {
        let mut input = input();
        input.gateway_credentials = Some(GatewayCredentials {
            username: "gw".into(),
            password: secrecy::SecretString::from(String::from("secret")),
        });
        let topology = Topology::build(input, &RunContext::default()).await;
        let gateway = topology.gateway.unwrap();
        assert_eq!(gateway.name, "MQTT-gateway-Acme");
        assert_eq!(gateway.device_type(), Some(DeviceType::Gateway));
    }

    #[test]
    fn report_counts_outcomes() {
        let mut report = OnboardReport::default();
        report.record("create asset", "S1", Ok(Outcome::Created));
        report.record("create asset", "Z1", Ok(Outcome::AlreadyExists));
        report.record("assign asset", "S1", Ok(Outcome::Skipped));
        report.record(
            "create relation",
            "S1 -> Z1",
            Err(CoreError::EntityNotFound {
                entity_type: "asset".into(),
                name: "Z1".into(),
            }),
        );
        assert_eq!(report.created, 1);
        assert_eq!(report.already_existed, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].target, "S1 -> Z1");
    }
}
