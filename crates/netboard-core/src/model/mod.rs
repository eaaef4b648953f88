// Domain model: topology entities, remote identifiers, telemetry records.

mod entity;
mod entity_id;
mod telemetry;

pub use entity::{AssetType, DeviceType, Entity, EntityKind, EntityRef, EntityType, IP_KEY};
pub use entity_id::EntityId;
pub use telemetry::{TelemetryPoint, TelemetryRecord, now_ms};
