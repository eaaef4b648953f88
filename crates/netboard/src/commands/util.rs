//! Shared helpers for command handlers.

use std::path::{Path, PathBuf};

use netboard_api::TransportConfig;
use netboard_config::{PlatformFile, Settings, load_testbed};
use netboard_core::RestPlatform;
use netboard_core::collect::ExternalCollector;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub fn load_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    Ok(Settings::load(global.settings.as_deref())?)
}

/// `flag` when given, else the configured path.
pub fn pick(flag: Option<&PathBuf>, configured: &Path) -> PathBuf {
    flag.cloned().unwrap_or_else(|| configured.to_path_buf())
}

/// Log in to the platform named in the platform file.
pub async fn connect_platform(file: &PlatformFile) -> Result<RestPlatform, CliError> {
    let url = file.api_url()?;
    let password = file.api_password()?;
    let transport = TransportConfig::default().with_env_proxy();
    Ok(RestPlatform::connect(url, &file.api.username, &password, &transport).await?)
}

/// Collector over the devices listed in `testbed_path`.
pub fn external_collector(settings: &Settings, testbed_path: &Path) -> Result<ExternalCollector, CliError> {
    let testbed = load_testbed(testbed_path)?;
    if testbed.device_names().is_empty() {
        warn!(path = %testbed_path.display(), "testbed lists no devices");
    }
    Ok(ExternalCollector::new(
        testbed,
        settings.collector.collector_config(testbed_path),
    ))
}

/// Token cancelled on Ctrl-C; loops finish their current wait and return,
/// and a pending broker connection is abandoned.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            trigger.cancel();
        }
    });
    token
}
