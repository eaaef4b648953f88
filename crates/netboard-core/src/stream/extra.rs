// Extended switch diagnostics, kept on disk only.
//
// Each round runs a fixed command list on every switch and stores both the
// raw CLI text and the parsed JSON. Nothing is published.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Cadence, run_rounds};
use crate::collect::{DeviceCollector, SnapshotStore};
use crate::model::now_ms;

pub const EXTRA_COMMANDS: [&str; 9] = [
    "show environment",
    "show environment all",
    "show environment power all",
    "show power status all",
    "show power total",
    "show power available",
    "show power used",
    "show version",
    "show int status",
];

/// Raw CLI output per command for one device.
pub type CliOutputs = BTreeMap<String, String>;

pub struct ExtraCollector {
    collector: Arc<dyn DeviceCollector>,
    snapshots: SnapshotStore,
    workers: usize,
    dry_run: bool,
}

impl ExtraCollector {
    pub fn new(
        collector: Arc<dyn DeviceCollector>,
        snapshots: SnapshotStore,
        workers: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            collector,
            snapshots,
            workers: workers.max(1),
            dry_run,
        }
    }

    /// Collect every device once; returns the raw outputs by device.
    pub async fn collect_round(&self) -> BTreeMap<String, CliOutputs> {
        let devices = self.collector.devices();
        info!(devices = devices.len(), "collecting extended diagnostics");
        stream::iter(devices)
            .map(|device| async move {
                let outputs = self.collect_device(&device).await;
                (device, outputs)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    /// Run until cancelled. In dry-run mode every round's CLI outputs are
    /// written to `out` as JSON lines instead of being saved.
    pub async fn run<W: Write + Send>(
        &self,
        cadence: Cadence,
        cancel: &CancellationToken,
        out: &mut W,
    ) -> u64 {
        let out = std::sync::Mutex::new(out);
        run_rounds(cancel, cadence, |_| {
            let out = &out;
            async move {
                let outputs = self.collect_round().await;
                if self.dry_run {
                    let mut out = out.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    for (device, cli) in &outputs {
                        let mut line = serde_json::Map::new();
                        line.insert(device.clone(), serde_json::json!(cli));
                        let line = serde_json::Value::Object(line);
                        if let Err(e) = writeln!(out, "{line}") {
                            warn!(error = %e, "cannot write dry-run output");
                        }
                    }
                }
            }
        })
        .await
    }

    async fn collect_device(&self, device: &str) -> CliOutputs {
        let mut outputs = CliOutputs::new();
        let mut session = match self.collector.connect(device).await {
            Ok(session) => session,
            Err(e) => {
                warn!(device, error = %e, "cannot connect to switch");
                return outputs;
            }
        };

        let ts = now_ms();
        for command in EXTRA_COMMANDS {
            let cli = match session.execute(command).await {
                Ok(cli) => cli,
                Err(e) => {
                    warn!(device, command, error = %e, "command failed");
                    continue;
                }
            };
            let parsed = match session.parse(command).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(device, command, error = %e, "no parsed output");
                    continue;
                }
            };
            if !self.dry_run {
                if let Err(e) = self.snapshots.save_pair(device, command, ts, &cli, &parsed).await {
                    warn!(device, command, error = %e, "cannot save diagnostics");
                }
            }
            outputs.insert(command.to_owned(), cli);
        }
        session.disconnect().await;
        outputs
    }
}
