// ── CDP neighbors ──
//
// Parsed `show cdp neighbors` output has the shape
// `{"cdp": {"index": {"1": {"device_id", "local_interface", "platform"}}}}`.
// Access points are recognised by their platform string.

use serde_json::Value;
use tracing::debug;

/// Platform substrings that identify an access point.
const AP_PLATFORMS: [&str; 2] = ["AX", "AIR-"];

/// An access point seen on a switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApNeighbor {
    pub ap_name: String,
    pub local_interface: String,
}

/// Extract AP neighbors from parsed CDP output.
///
/// Entries missing any of the three fields are ignored, as is output with
/// no `cdp.index` table.
pub fn ap_neighbors(parsed: &Value) -> Vec<ApNeighbor> {
    let Some(index) = parsed
        .get("cdp")
        .and_then(|cdp| cdp.get("index"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    index
        .iter()
        .filter_map(|(idx, entry)| {
            let platform = entry.get("platform")?.as_str()?;
            if !AP_PLATFORMS.iter().any(|p| platform.contains(p)) {
                return None;
            }
            let neighbor = ApNeighbor {
                ap_name: entry.get("device_id")?.as_str()?.to_owned(),
                local_interface: entry.get("local_interface")?.as_str()?.to_owned(),
            };
            debug!(idx, ap = %neighbor.ap_name, interface = %neighbor.local_interface, "AP neighbor");
            Some(neighbor)
        })
        .collect()
}
