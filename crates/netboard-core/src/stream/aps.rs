// AP power streamer.
//
// Reads what the switch streamer left on disk: the CDP table of every
// switch (once, at startup) and then, each round, the newest PoE detail
// snapshot of each AP-facing port.

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::switches::{CDP_COMMAND, power_detail_command};
use super::{Cadence, TelemetrySink, deliver_round, run_rounds};
use crate::cdp::{ApNeighbor, ap_neighbors};
use crate::collect::SnapshotStore;
use crate::error::CoreError;
use crate::model::{TelemetryPoint, TelemetryRecord};

/// Metric name for the measured PoE draw.
pub const POE_KEY: &str = "PoE";

/// APs hanging off one switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchNeighbors {
    pub switch: String,
    pub aps: Vec<ApNeighbor>,
}

pub struct ApStreamer {
    snapshots: SnapshotStore,
    workers: usize,
    neighbors: Vec<SwitchNeighbors>,
}

impl ApStreamer {
    /// Load the newest CDP snapshot of every switch under the snapshot root.
    pub async fn load(snapshots: SnapshotStore, workers: usize) -> Result<Self, CoreError> {
        let workers = workers.max(1);
        let switches = snapshots.devices().await?;
        let store = &snapshots;
        let neighbors: Vec<SwitchNeighbors> = stream::iter(switches)
            .map(|switch| async move {
                let aps = match store.read_latest(&switch, CDP_COMMAND).await {
                    Ok(Some((_, cdp))) => ap_neighbors(&cdp),
                    Ok(None) => {
                        warn!(switch, "no CDP snapshot");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(switch, error = %e, "cannot read CDP snapshot");
                        Vec::new()
                    }
                };
                SwitchNeighbors { switch, aps }
            })
            .buffered(workers)
            .collect()
            .await;

        let total: usize = neighbors.iter().map(|n| n.aps.len()).sum();
        info!(switches = neighbors.len(), aps = total, "loaded CDP neighbors");
        Ok(Self {
            snapshots,
            workers,
            neighbors,
        })
    }

    pub fn neighbors(&self) -> &[SwitchNeighbors] {
        &self.neighbors
    }

    /// One record per AP; APs without a snapshot carry an empty series.
    pub async fn collect_round(&self) -> Vec<TelemetryRecord> {
        let per_switch: Vec<Vec<TelemetryRecord>> = stream::iter(&self.neighbors)
            .map(|switch| self.read_switch(switch))
            .buffered(self.workers)
            .collect()
            .await;
        let records: Vec<TelemetryRecord> = per_switch.into_iter().flatten().collect();
        info!(aps = records.len(), "read AP power");
        records
    }

    pub async fn run(&self, sink: &dyn TelemetrySink, cadence: Cadence, cancel: &CancellationToken) -> u64 {
        run_rounds(cancel, cadence, |_| async move {
            let records = self.collect_round().await;
            deliver_round(sink, &records).await;
        })
        .await
    }

    async fn read_switch(&self, switch: &SwitchNeighbors) -> Vec<TelemetryRecord> {
        let mut records = Vec::with_capacity(switch.aps.len());
        for ap in &switch.aps {
            let mut record = TelemetryRecord::new();
            record.ensure_device(&ap.ap_name);
            match self.read_power(&switch.switch, ap).await {
                Some(point) => record.push(&ap.ap_name, point),
                None => warn!(ap = %ap.ap_name, switch = %switch.switch, "skipping AP power"),
            }
            records.push(record);
        }
        records
    }

    async fn read_power(&self, switch: &str, ap: &ApNeighbor) -> Option<TelemetryPoint> {
        let command = power_detail_command(&ap.local_interface);
        let (ts, detail) = match self.snapshots.read_latest(switch, &command).await {
            Ok(found) => found?,
            Err(e) => {
                warn!(switch, command, error = %e, "cannot read power detail");
                return None;
            }
        };
        let measured = measured_consumption(&detail, &ap.local_interface)?;
        let mut point = TelemetryPoint::new(ts);
        point.insert(POE_KEY, measured);
        Some(point)
    }
}

/// `interface.<if>.measured_consumption` as a float.
pub fn measured_consumption(detail: &Value, interface: &str) -> Option<f64> {
    let value = detail
        .get("interface")?
        .get(interface)?
        .get("measured_consumption")?;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_measured_consumption() {
        let detail = json!({"interface": {"Gi1/0/5": {"measured_consumption": 6.5}}});
        assert_eq!(measured_consumption(&detail, "Gi1/0/5"), Some(6.5));
        assert_eq!(measured_consumption(&detail, "Gi1/0/6"), None);

        let textual = json!({"interface": {"Gi1/0/5": {"measured_consumption": "7.25"}}});
        assert_eq!(measured_consumption(&textual, "Gi1/0/5"), Some(7.25));
    }

    #[tokio::test]
    async fn streams_from_saved_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        let cdp = json!({"cdp": {"index": {
            "1": {"device_id": "AP1", "local_interface": "Gi1/0/5", "platform": "cisco C9120AXI"},
            "2": {"device_id": "AP2", "local_interface": "Gi1/0/6", "platform": "cisco AIR-AP1852"}
        }}});
        store.save_json("SW1", CDP_COMMAND, 100, &cdp).await.unwrap();
        store
            .replace_json(
                "SW1",
                &power_detail_command("Gi1/0/5"),
                1_680_703_200_000,
                &json!({"interface": {"Gi1/0/5": {"measured_consumption": 6.5}}}),
            )
            .await
            .unwrap();

        let streamer = ApStreamer::load(store, 8).await.unwrap();
        assert_eq!(streamer.neighbors()[0].aps.len(), 2);

        let records = streamer.collect_round().await;
        assert_eq!(records.len(), 2);

        let ap1 = records[0].points("AP1");
        assert_eq!(ap1.len(), 1);
        assert_eq!(ap1[0].ts, 1_680_703_200_000);
        assert_eq!(ap1[0].values[POE_KEY], 6.5);

        assert!(records[1].points("AP2").is_empty());
        assert_eq!(records[1].devices().collect::<Vec<_>>(), ["AP2"]);
    }
}
