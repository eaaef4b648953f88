//! Topology model and pipelines between `netboard-api` and the `netboard` CLI.
//!
//! This crate owns everything that is not wire plumbing:
//!
//! - **Domain model** ([`model`]): [`Entity`] with parent/child relation
//!   maps and attributes, [`EntityRef`] name handles, [`EntityId`], and
//!   gateway [`TelemetryRecord`]s.
//!
//! - **[`topology`]**: turns association and device records into entities.
//!
//! - **[`Platform`]**: async boundary over the IoT platform, implemented by
//!   [`RestPlatform`]. Every call returns an [`Outcome`] or a [`CoreError`];
//!   remote IDs are resolved by name on each call.
//!
//! - **[`onboard`]**: the ordered onboarding run over a built [`Topology`],
//!   plus live discovery of switch stacks in [`onboard::online`].
//!
//! - **[`stream`]**: poll/transform/publish rounds for switches and APs,
//!   and the disk-only diagnostics collector.
//!
//! - **[`export`]**: historical PoE export to workbooks and JSON.
//!
//! - **[`collect`]**: the device CLI boundary ([`DeviceCollector`]) and
//!   the on-disk [`SnapshotStore`].

pub mod cdp;
pub mod collect;
pub mod context;
pub mod error;
pub mod export;
pub mod model;
pub mod onboard;
pub mod platform;
pub mod stream;
pub mod topology;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collect::{CollectError, DeviceCollector, DeviceSession, SnapshotStore, Testbed};
pub use context::{RunContext, RunMode};
pub use error::CoreError;
pub use export::{ExportSummary, ExportWindow};
pub use model::{
    AssetType, DeviceType, Entity, EntityId, EntityKind, EntityRef, EntityType, TelemetryPoint,
    TelemetryRecord,
};
pub use onboard::{OnboardReport, Topology, TopologyInput};
pub use platform::{Outcome, Platform, RestPlatform};
pub use stream::{GatewayPublisher, PublisherFactory, TelemetrySink};
pub use topology::{AssociationRecord, DeviceRecord, TopologyError, TopologyRecord};
