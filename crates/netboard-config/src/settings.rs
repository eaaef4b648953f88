// Layered settings: built-in defaults, an optional TOML file, then
// `NETBOARD_`-prefixed environment variables (`__` separates sections).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use netboard_core::collect::{CommandTemplate, ExternalCollectorConfig};
use netboard_core::stream::Cadence;
use netboard_core::RunMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;

/// Points at the settings file when `--settings` is not given.
pub const SETTINGS_ENV: &str = "NETBOARD_SETTINGS";

// ── Sections ────────────────────────────────────────────────────────

/// Input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub platform: PathBuf,
    pub sites: PathBuf,
    pub zones: PathBuf,
    pub aps: PathBuf,
    pub switches: PathBuf,
    pub testbed: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            platform: "yaml/platform.yml".into(),
            sites: "yaml/sites.yml".into(),
            zones: "yaml/zones.yml".into(),
            aps: "yaml/aps.yml".into(),
            switches: "yaml/switches.yml".into(),
            testbed: "testbed.yml".into(),
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirs {
    /// Snapshots written by the switch streamer and read by the AP streamer.
    pub snapshots: PathBuf,
    pub extra_snapshots: PathBuf,
    pub export: PathBuf,
}

impl Default for OutputDirs {
    fn default() -> Self {
        Self {
            snapshots: "snapshots".into(),
            extra_snapshots: "snapshots-extra".into(),
            export: "export".into(),
        }
    }
}

/// The external program that talks to devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// Prints parsed JSON for `{command}` on `{device}`.
    pub parse: CommandTemplate,
    /// Prints the raw CLI output for `{command}` on `{device}`.
    pub execute: CommandTemplate,
    pub timeout_secs: u64,
}

fn collect_template(verb: &str) -> CommandTemplate {
    CommandTemplate {
        program: "netboard-collect".into(),
        args: [verb, "--testbed", "{testbed}", "--device", "{device}", "{command}"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            parse: collect_template("parse"),
            execute: collect_template("execute"),
            timeout_secs: 120,
        }
    }
}

impl CollectorSettings {
    pub fn collector_config(&self, testbed_file: &Path) -> ExternalCollectorConfig {
        ExternalCollectorConfig {
            parse: self.parse.clone(),
            execute: self.execute.clone(),
            testbed_file: Some(testbed_file.to_path_buf()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Cadence and pool size of one streaming loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamJob {
    #[serde(default)]
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
    /// Wait after publishing before disconnecting from the broker.
    #[serde(default)]
    pub settle_secs: u64,
    pub workers: usize,
}

impl StreamJob {
    pub fn cadence(&self) -> Cadence {
        Cadence {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            interval: Duration::from_secs(self.interval_secs),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub aps: StreamJob,
    pub switches: StreamJob,
    pub extra: StreamJob,
    /// Pool size for live switch discovery during onboarding.
    pub discovery_workers: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            aps: StreamJob {
                initial_delay_secs: 0,
                interval_secs: 540,
                settle_secs: 120,
                workers: 8,
            },
            switches: StreamJob {
                initial_delay_secs: 0,
                interval_secs: 270,
                settle_secs: 60,
                workers: 4,
            },
            extra: StreamJob {
                initial_delay_secs: 0,
                interval_secs: 3600,
                settle_secs: 0,
                workers: 4,
            },
            discovery_workers: 4,
        }
    }
}

/// Everything that is not a credential or a topology document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: Paths,
    pub output: OutputDirs,
    pub collector: CollectorSettings,
    pub stream: StreamSettings,
}

// ── Loading ─────────────────────────────────────────────────────────

/// Default settings file location via platform conventions.
fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "netboard", "netboard").map(|dirs| dirs.config_dir().join("settings.toml"))
}

/// The settings file to read: `explicit`, else `NETBOARD_SETTINGS`, else
/// the per-user config dir.
pub fn settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            std::env::var_os(SETTINGS_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .or_else(default_settings_path)
}

impl Settings {
    /// Load settings. A file named explicitly (flag or `NETBOARD_SETTINGS`)
    /// must exist; the per-user default may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit.is_some() || std::env::var_os(SETTINGS_ENV).is_some_and(|v| !v.is_empty());
        let path = settings_path(explicit);

        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            if named && !path.exists() {
                return Err(ConfigError::Missing { path });
            }
            debug!(path = %path.display(), "settings file");
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(
            Env::prefixed("NETBOARD_")
                .ignore(&["SETTINGS", "API_PASSWORD", "BROKER_PASSWORD"])
                .split("__"),
        );

        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let jobs = [
            ("stream.aps", &self.stream.aps),
            ("stream.switches", &self.stream.switches),
            ("stream.extra", &self.stream.extra),
        ];
        for (field, job) in jobs {
            if job.interval_secs == 0 {
                return Err(ConfigError::Validation {
                    field: format!("{field}.interval_secs"),
                    reason: "must be greater than zero".into(),
                });
            }
            if job.workers == 0 {
                return Err(ConfigError::Validation {
                    field: format!("{field}.workers"),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

// ── Run mode ────────────────────────────────────────────────────────

/// Parse a boolean flag: `true/false/1/0/yes/no/on/off`, any case.
pub fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Validation {
            field: name.into(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Run mode from raw `IS_OFFLINE` / `APS_ONLY` values.
///
/// Unset `IS_OFFLINE` means online; unset `APS_ONLY` means APs only.
/// A blank value counts as unset.
pub fn run_mode(is_offline: Option<&str>, aps_only: Option<&str>) -> Result<RunMode, ConfigError> {
    let defaults = RunMode::default();
    let flag = |name: &str, value: Option<&str>, default: bool| {
        value
            .filter(|v| !v.trim().is_empty())
            .map_or(Ok(default), |v| parse_flag(name, v))
    };
    Ok(RunMode {
        offline: flag("IS_OFFLINE", is_offline, defaults.offline)?,
        aps_only: flag("APS_ONLY", aps_only, defaults.aps_only)?,
        dry_run: false,
    })
}

pub fn run_mode_from_env() -> Result<RunMode, ConfigError> {
    let is_offline = std::env::var("IS_OFFLINE").ok();
    let aps_only = std::env::var("APS_ONLY").ok();
    run_mode(is_offline.as_deref(), aps_only.as_deref())
}
