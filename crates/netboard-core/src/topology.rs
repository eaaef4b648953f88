// ── Topology builder ──
//
// Turns parsed YAML records into entities. Association records (sites,
// zones) and device records (APs, switches) are distinct types from the
// parsing boundary on.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::model::{AssetType, DeviceType, Entity, IP_KEY};

/// Device-record keys copied onto the entity as attributes.
pub const ATTRIBUTE_KEYS: [&str; 2] = [IP_KEY, "switch"];

/// `{mapKey: <own name>, mapValue: {<relation key>: <child name>}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssociationRecord {
    #[serde(rename = "mapKey")]
    pub map_key: String,
    #[serde(rename = "mapValue", default)]
    pub map_value: IndexMap<String, String>,
}

/// A named device with its relation/attribute fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub fields: IndexMap<String, String>,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>, fields: IndexMap<String, String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// A topology record as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyRecord {
    Association(AssociationRecord),
    Device(DeviceRecord),
}

impl TopologyRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Association(r) => &r.map_key,
            Self::Device(r) => &r.name,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("'{name}' declares {count} children in mapValue; exactly one is supported")]
    MultipleChildren { name: String, count: usize },

    #[error("record '{name}' is an {actual} record and cannot build a {requested}")]
    RecordMismatch {
        name: String,
        actual: &'static str,
        requested: String,
    },
}

/// Build an asset from an association record.
///
/// The single `mapValue` entry becomes `children[child] = relation key`.
pub fn build_asset(record: &AssociationRecord, asset_type: AssetType) -> Result<Entity, TopologyError> {
    if record.map_value.len() > 1 {
        return Err(TopologyError::MultipleChildren {
            name: record.map_key.clone(),
            count: record.map_value.len(),
        });
    }

    let mut asset = Entity::asset(record.map_key.clone(), asset_type);
    match record.map_value.first() {
        Some((key, child)) => asset.add_child(child.clone(), key.clone()),
        None => warn!(name = %record.map_key, "association record has no child"),
    }
    Ok(asset)
}

/// Build a device from a device record.
///
/// Every field except `ip` names a parent; `ip` and `switch` are also kept
/// as attributes.
pub fn build_device(record: &DeviceRecord, device_type: DeviceType) -> Entity {
    let mut device = Entity::device(record.name.clone(), device_type);

    let by_parent: IndexMap<String, String> = record
        .fields
        .iter()
        .filter(|(key, _)| key.as_str() != IP_KEY)
        .map(|(key, parent)| (parent.clone(), key.clone()))
        .collect();
    device.add_parents(&by_parent);

    for key in ATTRIBUTE_KEYS {
        if let Some(value) = record.fields.get(key) {
            device.add_attribute(key, value.clone());
        }
    }
    device
}

/// What a record should become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Asset(AssetType),
    Device(DeviceType),
}

/// Build one record into the requested entity kind.
pub fn build_entity(record: &TopologyRecord, target: BuildTarget) -> Result<Entity, TopologyError> {
    match (record, target) {
        (TopologyRecord::Association(r), BuildTarget::Asset(t)) => build_asset(r, t),
        (TopologyRecord::Device(r), BuildTarget::Device(t)) => Ok(build_device(r, t)),
        (TopologyRecord::Association(r), BuildTarget::Device(t)) => {
            Err(TopologyError::RecordMismatch {
                name: r.map_key.clone(),
                actual: "association",
                requested: t.to_string(),
            })
        }
        (TopologyRecord::Device(r), BuildTarget::Asset(t)) => Err(TopologyError::RecordMismatch {
            name: r.name.clone(),
            actual: "device",
            requested: t.to_string(),
        }),
    }
}

/// Build every association record; failures are returned beside the
/// successes instead of stopping the batch.
pub fn build_assets(
    records: &[AssociationRecord],
    asset_type: AssetType,
) -> (Vec<Entity>, Vec<TopologyError>) {
    let mut built = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for record in records {
        match build_asset(record, asset_type) {
            Ok(asset) => built.push(asset),
            Err(e) => errors.push(e),
        }
    }
    (built, errors)
}

pub fn build_devices(records: &[DeviceRecord], device_type: DeviceType) -> Vec<Entity> {
    records
        .iter()
        .map(|record| build_device(record, device_type))
        .collect()
}
