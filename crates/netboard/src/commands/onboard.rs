//! `onboard` and `onboard-switches`.

use netboard_config::{load_devices_or_empty, load_platform, load_sites, load_zones, run_mode_from_env};
use netboard_core::onboard::{self, Failure, online};
use netboard_core::stream::MqttPublisherFactory;
use netboard_core::topology::build_devices;
use netboard_core::{
    DeviceRecord, DeviceType, Entity, GatewayPublisher, OnboardReport, PublisherFactory, RunContext,
    Topology, TopologyInput, TopologyRecord,
};
use tabled::Tabled;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, OnboardArgs, OnboardSwitchesArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Parents")]
    parents: String,
    #[tabled(rename = "Children")]
    children: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

fn pairs<'a>(map: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    map.into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&Entity> for EntityRow {
    fn from(e: &Entity) -> Self {
        Self {
            name: e.name.clone(),
            kind: e.kind.subtype().into(),
            parents: pairs(&e.parents),
            children: pairs(&e.children),
            attributes: pairs(&e.attributes),
        }
    }
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&Failure> for FailureRow {
    fn from(f: &Failure) -> Self {
        Self {
            operation: f.operation.clone(),
            target: f.target.clone(),
            reason: f.reason.clone(),
        }
    }
}

fn topology_detail(topology: &Topology) -> String {
    let rows: Vec<EntityRow> = topology
        .customer
        .iter()
        .chain(topology.gateway.iter())
        .chain(topology.assets())
        .chain(topology.aps.iter())
        .chain(topology.switches.iter())
        .map(EntityRow::from)
        .collect();
    let mut out = output::render_table(&rows);
    for rejected in &topology.rejected {
        out.push_str(&format!("\nrejected {}: {}", rejected.name, rejected.reason));
    }
    out
}

fn report_detail(report: &OnboardReport) -> String {
    let mut out = output::detail(&[
        ("created", report.created.to_string()),
        ("already existed", report.already_existed.to_string()),
        ("skipped", report.skipped.to_string()),
        ("failed", report.failures.len().to_string()),
    ]);
    if !report.failures.is_empty() {
        let rows: Vec<FailureRow> = report.failures.iter().map(FailureRow::from).collect();
        out.push('\n');
        out.push_str(&output::render_table(&rows));
    }
    out
}

fn finish(report: &OnboardReport, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, report, report_detail)?;
    output::print_output(&out, global.quiet)?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            failed: report.failures.len(),
        })
    }
}

// ── onboard ──────────────────────────────────────────────────────────

pub async fn handle(args: OnboardArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = util::load_settings(global)?;
    let paths = &settings.paths;

    let mut mode = run_mode_from_env()?;
    if let Some(offline) = args.offline {
        mode.offline = offline;
    }
    if let Some(aps_only) = args.aps_only {
        mode.aps_only = aps_only;
    }
    mode.dry_run = args.dry_run;
    info!(offline = mode.offline, aps_only = mode.aps_only, dry_run = mode.dry_run, "onboarding");

    let platform_file = load_platform(&util::pick(args.files.platform_file.as_ref(), &paths.platform))?;
    let sites = load_sites(&util::pick(args.files.sites_file.as_ref(), &paths.sites))?;
    let zones = load_zones(&util::pick(args.files.zones_file.as_ref(), &paths.zones))?;
    let aps = if mode.onboards_aps() {
        load_devices_or_empty(&util::pick(args.files.aps_file.as_ref(), &paths.aps))
    } else {
        Vec::new()
    };
    let switches = if mode.onboards_switches() {
        load_devices_or_empty(&util::pick(args.files.switches_file.as_ref(), &paths.switches))
    } else {
        Vec::new()
    };

    let input = TopologyInput {
        customer: platform_file.customer_name().map(str::to_owned),
        gateway_credentials: platform_file.gateway_credentials()?,
        sites,
        zones,
        aps,
        switches,
    };
    let ctx = RunContext::new(mode, settings.stream.discovery_workers);
    let topology = Topology::build(input, &ctx).await;
    for rejected in &topology.rejected {
        warn!(record = %rejected.name, reason = %rejected.reason, "record rejected");
    }

    if mode.dry_run {
        let out = output::render_single(global.output, &topology, topology_detail)?;
        return output::print_output(&out, global.quiet);
    }

    let platform = util::connect_platform(&platform_file).await?;
    let report = onboard::onboard(&platform, &topology).await?;
    finish(&report, global)
}

// ── onboard-switches ─────────────────────────────────────────────────

fn device_records(records: Vec<TopologyRecord>) -> Vec<DeviceRecord> {
    records
        .into_iter()
        .filter_map(|r| match r {
            TopologyRecord::Device(d) => Some(d),
            TopologyRecord::Association(_) => None,
        })
        .collect()
}

pub async fn handle_switches(args: OnboardSwitchesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = util::load_settings(global)?;
    let paths = &settings.paths;

    let platform_file = load_platform(&util::pick(args.platform_file.as_ref(), &paths.platform))?;
    let testbed_path = util::pick(args.testbed_file.as_ref(), &paths.testbed);
    let collector = util::external_collector(&settings, &testbed_path)?;

    let members = online::discover(&collector, settings.stream.discovery_workers).await;
    info!(members = members.len(), "stack members discovered");

    if args.dry_run {
        let out = output::render_list(global.output, &members, |e: &Entity| EntityRow::from(e))?;
        return output::print_output(&out, global.quiet);
    }

    let records = device_records(load_devices_or_empty(&util::pick(
        args.switches_file.as_ref(),
        &paths.switches,
    )));
    let switch_records = build_devices(&records, DeviceType::Switch);

    let platform = util::connect_platform(&platform_file).await?;
    let publisher: Option<Box<dyn GatewayPublisher>> = match platform_file.broker_config()? {
        Some(broker) => Some(MqttPublisherFactory::new(broker).connect().await?),
        None => {
            warn!("no broker configured; gateway announcements will be skipped");
            None
        }
    };

    let result = online::onboard_switches(
        &platform,
        publisher.as_deref(),
        platform_file.customer_name(),
        &switch_records,
        &members,
    )
    .await;
    if let Some(publisher) = publisher {
        publisher.disconnect().await;
    }
    finish(&result?, global)
}
