// YAML documents: the platform file, topology files and the testbed.
//
// The platform, sites and zones files are required; APs and switches are
// optional branches that degrade to zero records.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use netboard_api::transport::PROXY_ENV;
use netboard_api::{BrokerConfig, GatewayCredentials};
use netboard_core::{AssociationRecord, DeviceRecord, Testbed, TopologyRecord};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, warn};
use url::Url;

use crate::ConfigError;
use crate::credentials::{SecretKind, resolve_password};

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

fn default_broker_port() -> u16 {
    1883
}

// ── Platform file ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    pub url: String,
    pub username: String,
    /// Plaintext fallback; prefer the keyring or `NETBOARD_API_PASSWORD`.
    #[serde(default, deserialize_with = "secret")]
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSection {
    pub destination: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, deserialize_with = "secret")]
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerSection {
    #[serde(default)]
    pub name: Option<String>,
}

/// `api`, optional `broker` and optional `customer`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformFile {
    pub api: ApiSection,
    #[serde(default)]
    pub broker: Option<BrokerSection>,
    #[serde(default)]
    pub customer: Option<CustomerSection>,
}

impl PlatformFile {
    /// The configured customer, ignoring blank names.
    pub fn customer_name(&self) -> Option<&str> {
        self.customer
            .as_ref()?
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        self.api.url.parse().map_err(|_| ConfigError::Validation {
            field: "api.url".into(),
            reason: format!("invalid URL: {}", self.api.url),
        })
    }

    pub fn api_password(&self) -> Result<SecretString, ConfigError> {
        resolve_password(SecretKind::Api, &self.api.username, self.api.password.as_ref())
    }

    /// Broker connection settings, if a broker is configured.
    ///
    /// `HTTPS_PROXY` becomes the broker's HTTP CONNECT proxy.
    pub fn broker_config(&self) -> Result<Option<BrokerConfig>, ConfigError> {
        let Some(broker) = &self.broker else {
            return Ok(None);
        };
        let password = resolve_password(SecretKind::Broker, &broker.username, broker.password.as_ref())?;
        let mut config = BrokerConfig::new(
            broker.destination.clone(),
            broker.port,
            broker.username.clone(),
            password,
        );
        config.proxy = std::env::var(PROXY_ENV).ok().filter(|p| !p.is_empty());
        Ok(Some(config))
    }

    /// Credentials for the gateway device, when a broker is configured.
    pub fn gateway_credentials(&self) -> Result<Option<GatewayCredentials>, ConfigError> {
        let Some(broker) = &self.broker else {
            return Ok(None);
        };
        let password = resolve_password(SecretKind::Broker, &broker.username, broker.password.as_ref())?;
        Ok(Some(GatewayCredentials {
            username: broker.username.clone(),
            password,
        }))
    }
}

// ── Topology files ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<AssociationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZonesFile {
    pub zones: Vec<AssociationRecord>,
}

/// `{devices: {name: {key: value}}}`; values may be any YAML scalar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicesFile {
    #[serde(default)]
    pub devices: IndexMap<String, Option<IndexMap<String, serde_yaml::Value>>>,
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl DevicesFile {
    /// One record per device; non-scalar fields are dropped with a warning.
    pub fn records(&self) -> Vec<DeviceRecord> {
        self.devices
            .iter()
            .map(|(name, fields)| {
                let mut record = IndexMap::new();
                for (key, value) in fields.iter().flatten() {
                    match scalar(value) {
                        Some(text) => {
                            record.insert(key.clone(), text);
                        }
                        None => warn!(device = %name, key, "ignoring non-scalar field"),
                    }
                }
                DeviceRecord::new(name.clone(), record)
            })
            .collect()
    }
}

// ── Loading ─────────────────────────────────────────────────────────

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    debug!(path = %path.display(), "parsing YAML");
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: PathBuf::from(path),
        source,
    })
}

pub fn load_platform(path: &Path) -> Result<PlatformFile, ConfigError> {
    read_yaml(path)
}

pub fn load_sites(path: &Path) -> Result<Vec<TopologyRecord>, ConfigError> {
    let file: SitesFile = read_yaml(path)?;
    Ok(file.sites.into_iter().map(TopologyRecord::Association).collect())
}

pub fn load_zones(path: &Path) -> Result<Vec<TopologyRecord>, ConfigError> {
    let file: ZonesFile = read_yaml(path)?;
    Ok(file.zones.into_iter().map(TopologyRecord::Association).collect())
}

pub fn load_devices(path: &Path) -> Result<Vec<TopologyRecord>, ConfigError> {
    let file: DevicesFile = read_yaml(path)?;
    Ok(file.records().into_iter().map(TopologyRecord::Device).collect())
}

/// [`load_devices`] for optional branches: a missing file warns, a
/// malformed one logs an error, and both yield no records.
pub fn load_devices_or_empty(path: &Path) -> Vec<TopologyRecord> {
    match load_devices(path) {
        Ok(records) => records,
        Err(e) if e.is_missing() => {
            warn!(path = %path.display(), "devices file is missing");
            Vec::new()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot load devices file");
            Vec::new()
        }
    }
}

pub fn load_testbed(path: &Path) -> Result<Testbed, ConfigError> {
    read_yaml(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn platform_file_sections() {
        let yaml = r"
api:
  url: https://iot.example.com/api
  username: tenant@example.com
  password: hunter2
broker:
  destination: mqtt.example.com
  username: gateway-token
customer:
  name: '  '
";
        let file: PlatformFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.api_url().unwrap().as_str(), "https://iot.example.com/api");
        assert_eq!(
            file.api.password.as_ref().unwrap().expose_secret(),
            "hunter2"
        );
        let broker = file.broker.as_ref().unwrap();
        assert_eq!(broker.port, 1883);
        assert!(broker.password.is_none());
        assert_eq!(file.customer_name(), None);
    }

    #[test]
    fn device_scalars_become_strings() {
        let yaml = r"
devices:
  AP1:
    zone: Z1
    ip: 10.0.0.1
    floor: 3
    poe: true
    tags: [a, b]
  AP2:
";
        let file: DevicesFile = serde_yaml::from_str(yaml).unwrap();
        let records = file.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["floor"], "3");
        assert_eq!(records[0].fields["poe"], "true");
        assert!(!records[0].fields.contains_key("tags"));
        assert!(records[1].fields.is_empty());
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let file: PlatformFile =
            serde_yaml::from_str("api: {url: 'not a url', username: u}").unwrap();
        assert!(matches!(
            file.api_url(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
