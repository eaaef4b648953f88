#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use netboard_config::{
    ConfigError, load_devices, load_devices_or_empty, load_platform, load_sites, load_testbed,
    load_zones,
};
use netboard_core::TopologyRecord;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn sites_and_zones_become_association_records() {
    let dir = tempfile::tempdir().unwrap();
    let sites = write(
        dir.path(),
        "sites.yml",
        "sites:\n  - mapKey: S1\n    mapValue: {zone: Z1}\n",
    );
    let zones = write(
        dir.path(),
        "zones.yml",
        "zones:\n  - mapKey: Z1\n    mapValue: {}\n  - mapKey: Z2\n",
    );

    let sites = load_sites(&sites).unwrap();
    let zones = load_zones(&zones).unwrap();

    let TopologyRecord::Association(site) = &sites[0] else {
        panic!("expected an association record");
    };
    assert_eq!(site.map_key, "S1");
    assert_eq!(site.map_value["zone"], "Z1");
    assert_eq!(
        zones.iter().map(TopologyRecord::name).collect::<Vec<_>>(),
        ["Z1", "Z2"]
    );
}

#[test]
fn required_files_report_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_platform(&dir.path().join("platform.yml")).unwrap_err();
    assert!(err.is_missing());
    let err = load_sites(&dir.path().join("sites.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { .. }));
}

#[test]
fn optional_devices_file_degrades_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_devices_or_empty(&dir.path().join("aps.yml")).is_empty());

    let broken = write(dir.path(), "switches.yml", "devices: [unterminated\n");
    assert!(matches!(
        load_devices(&broken),
        Err(ConfigError::Yaml { .. })
    ));
    assert!(load_devices_or_empty(&broken).is_empty());
}

#[test]
fn devices_file_keeps_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let aps = write(
        dir.path(),
        "aps.yml",
        "devices:\n  AP9:\n    zone: Z1\n    ip: 10.0.0.9\n  AP1:\n    zone: Z2\n    switch: SW1\n",
    );

    let records = load_devices(&aps).unwrap();

    assert_eq!(
        records.iter().map(TopologyRecord::name).collect::<Vec<_>>(),
        ["AP9", "AP1"]
    );
    let TopologyRecord::Device(ap1) = &records[1] else {
        panic!("expected a device record");
    };
    assert_eq!(ap1.fields["switch"], "SW1");
}

#[test]
fn platform_file_without_broker_has_no_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "platform.yml",
        "api:\n  url: https://iot.example.com/api\n  username: tenant@example.com\ncustomer:\n  name: Acme\n",
    );

    let platform = load_platform(&path).unwrap();

    assert_eq!(platform.customer_name(), Some("Acme"));
    assert!(platform.gateway_credentials().unwrap().is_none());
    assert!(platform.broker_config().unwrap().is_none());
}

#[test]
fn testbed_lists_devices_and_cli_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "testbed.yml",
        "devices:\n  SW1:\n    os: iosxe\n    connections:\n      cli: {protocol: ssh, ip: 10.1.1.1}\n",
    );

    let testbed = load_testbed(&path).unwrap();

    assert_eq!(testbed.device_names(), ["SW1"]);
    assert_eq!(testbed.cli_address("SW1"), Some("10.1.1.1"));
}
