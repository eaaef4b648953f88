// Device inventory. Only the parts netboard reads are modelled; the rest of
// the testbed document is ignored.

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Testbed {
    #[serde(default)]
    pub devices: IndexMap<String, TestbedDevice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestbedDevice {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub connections: IndexMap<String, TestbedConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestbedConnection {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Testbed {
    pub fn device_names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// IP of the device's `cli` connection.
    pub fn cli_address(&self, device: &str) -> Option<&str> {
        self.devices
            .get(device)?
            .connections
            .get("cli")?
            .ip
            .as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_cli_address_and_ignores_extras() {
        let yaml = r"
testbed:
  name: lab
devices:
  SW1:
    os: iosxe
    type: switch
    credentials:
      default: {username: admin, password: admin}
    connections:
      cli:
        protocol: ssh
        ip: 10.1.1.1
        port: 22
  SW2:
    os: iosxe
";
        let testbed: Testbed = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(testbed.device_names(), ["SW1", "SW2"]);
        assert_eq!(testbed.cli_address("SW1"), Some("10.1.1.1"));
        assert_eq!(testbed.cli_address("SW2"), None);
        assert_eq!(testbed.cli_address("SW3"), None);
    }
}
