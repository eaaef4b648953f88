// On-disk snapshots of device command output.
//
// Layout: `<root>/<device>/<command with spaces as underscores>/<epoch-ms>[.ext]`.
// The switch streamer writes them and the AP streamer reads them back, so
// the file name doubles as the sample timestamp.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use super::CollectError;

/// Directory name used for a command's snapshots.
pub fn command_dir(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join("_")
}

/// A snapshot file and the timestamp encoded in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub ts: i64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CollectError + '_ {
    move |source| CollectError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, device: &str, command: &str) -> PathBuf {
        self.root.join(device).join(command_dir(command))
    }

    /// Devices that have at least one snapshot directory, sorted by name.
    pub async fn devices(&self) -> Result<Vec<String>, CollectError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.root)(e)),
        };
        let mut devices = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.root))? {
            let is_dir = entry
                .file_type()
                .await
                .map_err(io_error(&entry.path()))?
                .is_dir();
            if is_dir {
                devices.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        devices.sort();
        Ok(devices)
    }

    async fn write(&self, dir: &Path, file: String, contents: &[u8]) -> Result<PathBuf, CollectError> {
        fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        let path = dir.join(file);
        fs::write(&path, contents).await.map_err(io_error(&path))?;
        debug!(path = %path.display(), "saved snapshot");
        Ok(path)
    }

    /// Save compact JSON, keeping earlier snapshots.
    pub async fn save_json(
        &self,
        device: &str,
        command: &str,
        ts: i64,
        value: &Value,
    ) -> Result<PathBuf, CollectError> {
        let dir = self.dir(device, command);
        self.write(&dir, ts.to_string(), value.to_string().as_bytes())
            .await
    }

    /// Save compact JSON as the only snapshot for this command.
    pub async fn replace_json(
        &self,
        device: &str,
        command: &str,
        ts: i64,
        value: &Value,
    ) -> Result<PathBuf, CollectError> {
        let dir = self.dir(device, command);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&dir)(e)),
        }
        self.write(&dir, ts.to_string(), value.to_string().as_bytes())
            .await
    }

    /// Save raw CLI text as `<ts>.cli` and pretty JSON as `<ts>.json`.
    pub async fn save_pair(
        &self,
        device: &str,
        command: &str,
        ts: i64,
        cli: &str,
        parsed: &Value,
    ) -> Result<(), CollectError> {
        let dir = self.dir(device, command);
        self.write(&dir, format!("{ts}.cli"), cli.as_bytes()).await?;
        let pretty = serde_json::to_vec_pretty(parsed).map_err(|source| CollectError::Json {
            device: device.to_owned(),
            command: command.to_owned(),
            source,
        })?;
        self.write(&dir, format!("{ts}.json"), &pretty).await?;
        Ok(())
    }

    /// Newest extension-less snapshot, by the timestamp in its name.
    pub async fn latest(&self, device: &str, command: &str) -> Result<Option<Snapshot>, CollectError> {
        let dir = self.dir(device, command);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&dir)(e)),
        };

        let mut newest: Option<Snapshot> = None;
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
            let Some(ts) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i64>().ok())
            else {
                continue;
            };
            if newest.as_ref().is_none_or(|n| ts > n.ts) {
                newest = Some(Snapshot {
                    ts,
                    path: entry.path(),
                });
            }
        }
        Ok(newest)
    }

    /// Read and parse the newest JSON snapshot.
    pub async fn read_latest(
        &self,
        device: &str,
        command: &str,
    ) -> Result<Option<(i64, Value)>, CollectError> {
        let Some(snapshot) = self.latest(device, command).await? else {
            return Ok(None);
        };
        let bytes = fs::read(&snapshot.path)
            .await
            .map_err(io_error(&snapshot.path))?;
        let value = serde_json::from_slice(&bytes).map_err(|source| CollectError::Json {
            device: device.to_owned(),
            command: command.to_owned(),
            source,
        })?;
        Ok(Some((snapshot.ts, value)))
    }
}
