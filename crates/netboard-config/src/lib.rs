//! Configuration for the netboard CLI.
//!
//! Layered [`Settings`] (defaults, TOML file, `NETBOARD_*` environment),
//! the YAML documents netboard reads (platform, topology, testbed), run-mode
//! flags from the environment, and password resolution (env, keyring,
//! plaintext).

mod credentials;
mod files;
mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use credentials::{KEYRING_SERVICE, SecretKind, resolve_password};
pub use files::{
    ApiSection, BrokerSection, CustomerSection, DevicesFile, PlatformFile, SitesFile, ZonesFile,
    load_devices, load_devices_or_empty, load_platform, load_sites, load_testbed, load_zones,
};
pub use settings::{
    CollectorSettings, OutputDirs, Paths, SETTINGS_ENV, Settings, StreamJob, StreamSettings,
    parse_flag, run_mode, run_mode_from_env, settings_path,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("cannot parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} password configured")]
    NoCredentials { what: String },

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    /// Returns `true` if a required file does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}
