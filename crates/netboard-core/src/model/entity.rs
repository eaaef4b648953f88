// ── Topology entities ──
//
// A node in the customer → site → zone → device graph. Relations are kept
// as plain name maps; remote identifiers are never cached here and are
// resolved by name whenever a call needs one.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Key excluded from parent relations; it carries the management address.
pub const IP_KEY: &str = "ip";

/// Kinds of asset in the topology.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetType {
    Site,
    Zone,
}

/// Kinds of device in the topology.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Ap,
    Switch,
    Gateway,
    Default,
}

/// Coarse class understood by the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityType {
    Asset,
    Device,
    Customer,
}

impl From<EntityType> for netboard_api::EntityType {
    fn from(t: EntityType) -> Self {
        match t {
            EntityType::Asset => Self::Asset,
            EntityType::Device => Self::Device,
            EntityType::Customer => Self::Customer,
        }
    }
}

/// What an entity is, including its subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "class", content = "type")]
pub enum EntityKind {
    Asset(AssetType),
    Device(DeviceType),
    Customer,
}

impl EntityKind {
    pub fn entity_type(self) -> EntityType {
        match self {
            Self::Asset(_) => EntityType::Asset,
            Self::Device(_) => EntityType::Device,
            Self::Customer => EntityType::Customer,
        }
    }

    /// The lower-case subtype sent as the platform's `type` field.
    pub fn subtype(self) -> &'static str {
        match self {
            Self::Asset(AssetType::Site) => "site",
            Self::Asset(AssetType::Zone) => "zone",
            Self::Device(DeviceType::Ap) => "ap",
            Self::Device(DeviceType::Switch) => "switch",
            Self::Device(DeviceType::Gateway) => "gateway",
            Self::Device(DeviceType::Default) => "default",
            Self::Customer => "customer",
        }
    }
}

/// Name-only handle used for remote lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    pub name: String,
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }

    pub fn asset(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Asset)
    }

    pub fn device(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Device)
    }
}

/// An asset, device or customer with its relations and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    /// Child name → relation key (`"Z1" → "zone"`).
    pub children: IndexMap<String, String>,
    /// Relation key → parent name (`"zone" → "Z1"`).
    pub parents: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
}

impl Entity {
    fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: IndexMap::new(),
            parents: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn asset(name: impl Into<String>, asset_type: AssetType) -> Self {
        Self::new(name, EntityKind::Asset(asset_type))
    }

    pub fn device(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self::new(name, EntityKind::Device(device_type))
    }

    pub fn customer(name: impl Into<String>) -> Self {
        Self::new(name, EntityKind::Customer)
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn asset_type(&self) -> Option<AssetType> {
        match self.kind {
            EntityKind::Asset(t) => Some(t),
            _ => None,
        }
    }

    pub fn device_type(&self) -> Option<DeviceType> {
        match self.kind {
            EntityKind::Device(t) => Some(t),
            _ => None,
        }
    }

    pub fn to_ref(&self) -> EntityRef {
        EntityRef::new(self.name.clone(), self.entity_type())
    }

    pub fn add_child(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.children.insert(key.into(), value.into());
    }

    pub fn add_parent(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parents.insert(key.into(), value.into());
    }

    /// Bulk-insert parents from a `parent name → relation key` mapping.
    ///
    /// Each pair is stored inverted (`parents[relation key] = parent name`);
    /// entries whose relation key is `ip` are skipped.
    pub fn add_parents<'a, I>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (parent, key) in mapping {
            if key == IP_KEY {
                continue;
            }
            self.add_parent(key.clone(), parent.clone());
        }
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_per_key() {
        let mut site = Entity::asset("S1", AssetType::Site);
        site.add_child("Z1", "zone");
        site.add_child("Z1", "area");
        assert_eq!(site.children.len(), 1);
        assert_eq!(site.children["Z1"], "area");
    }

    #[test]
    fn add_parents_inverts_and_skips_ip() {
        let mut device = Entity::device("AP1", DeviceType::Ap);
        let mapping: IndexMap<String, String> = [
            ("Z1".to_string(), "zone".to_string()),
            ("10.0.0.1".to_string(), "ip".to_string()),
            ("SW1".to_string(), "switch".to_string()),
        ]
        .into_iter()
        .collect();

        device.add_parents(&mapping);

        assert_eq!(device.parents.get("zone").map(String::as_str), Some("Z1"));
        assert_eq!(device.parents.get("switch").map(String::as_str), Some("SW1"));
        assert!(!device.parents.contains_key("ip"));
    }

    #[test]
    fn kinds_map_to_wire_names() {
        let zone = Entity::asset("Z1", AssetType::Zone);
        assert_eq!(zone.entity_type(), EntityType::Asset);
        assert_eq!(zone.kind.subtype(), "zone");
        assert_eq!(zone.asset_type(), Some(AssetType::Zone));
        assert_eq!(zone.device_type(), None);

        let gw = Entity::device("GW", DeviceType::Gateway);
        assert_eq!(gw.kind.subtype(), "gateway");
        assert_eq!(gw.to_ref(), EntityRef::device("GW"));
        assert_eq!(DeviceType::Ap.to_string(), "ap");
        assert_eq!("switch".parse::<DeviceType>().ok(), Some(DeviceType::Switch));
    }
}
