//! Harp device folders end to end: schema, register dumps, QC.

use rust_datastreams::config::HarpSettings;
use rust_datastreams::harp::{
    harp_device, resolve_device_schema, DeviceYmlSource, HarpDeviceReaderParams, HarpMessage,
    MessageType, PayloadValues, RegisterData,
};
use rust_datastreams::qc::{HarpDeviceSuite, ResultsStatistics, Runner, Status};
use rust_datastreams::{load_branch, ContractError, Node};
use std::fs;
use std::path::Path;

const DEVICE_YML: &str = "\
device: Olfactometer
whoAmI: 1140
firmwareVersion: '1.0'
registers:
  Flow:
    address: 32
    type: Float
    length: 2
    description: Flow rate of the two channels.
";

fn read(address: u8, t: f64, values: PayloadValues) -> HarpMessage {
    HarpMessage {
        message_type: MessageType::Read,
        address,
        port: 255,
        timestamp: Some(t),
        values,
    }
}

fn dump(dir: &Path, address: u8, messages: Vec<HarpMessage>) {
    let data = RegisterData::new(address, messages);
    fs::write(
        dir.join(format!("Olfactometer_{address}.bin")),
        data.encode().unwrap(),
    )
    .unwrap();
}

fn device_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("device.yml"), DEVICE_YML).unwrap();
    dump(dir.path(), 0, vec![read(0, 0.0, PayloadValues::U16(vec![1140]))]);
    dump(
        dir.path(),
        32,
        vec![
            read(32, 0.0, PayloadValues::Float(vec![0.5, 1.5])),
            HarpMessage {
                message_type: MessageType::Event,
                ..read(32, 1.0, PayloadValues::Float(vec![0.75, 1.25]))
            },
        ],
    );
    dir
}

#[test]
fn test_register_leaves_are_lazy_and_decode_on_load() {
    let dir = device_dir();
    let params = HarpDeviceReaderParams::new(dir.path());
    let mut device = harp_device("Olfactometer", params, HarpSettings::default()).unwrap();
    device.load().unwrap();

    let streams = device.streams().unwrap();
    assert_eq!(streams.len(), 16);
    assert!(streams.nodes().all(|n| !n.has_data()));

    let flow = device.at_mut("Flow").unwrap();
    flow.load().unwrap();
    let data = flow.data().unwrap().as_harp().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.messages[1].values, PayloadValues::Float(vec![0.75, 1.25]));
    assert_eq!(data.timestamps(MessageType::Event), [1.0]);
}

#[test]
fn test_branch_load_reports_missing_dumps() {
    let dir = device_dir();
    let params = HarpDeviceReaderParams::new(dir.path().join("device.yml"));
    let mut root = Node::from(harp_device("Olfactometer", params, HarpSettings::default()).unwrap());

    let failures = load_branch(&mut root, false).unwrap();
    // Only WhoAmI and Flow were dumped.
    assert_eq!(failures.len(), 14);
    assert!(failures
        .iter()
        .all(|f| f.error.io_kind() == Some(std::io::ErrorKind::NotFound)));
    assert!(root.resolve("WhoAmI").unwrap().has_data());
}

#[test]
fn test_corrupt_dump_is_a_harp_error() {
    let dir = device_dir();
    fs::write(dir.path().join("Olfactometer_32.bin"), [0x01, 0x09, 0x20]).unwrap();
    let params = HarpDeviceReaderParams::new(dir.path()).without_common_registers();
    let mut device = harp_device("Olfactometer", params, HarpSettings::default()).unwrap();
    device.load().unwrap();
    let err = device.at_mut("Flow").unwrap().load().unwrap_err();
    assert!(matches!(err, ContractError::Harp(_)));
}

#[test]
fn test_explicit_schema_file() {
    let dir = device_dir();
    let elsewhere = tempfile::tempdir().unwrap();
    let yml = elsewhere.path().join("olfactometer.yml");
    fs::write(&yml, DEVICE_YML).unwrap();

    let params = HarpDeviceReaderParams::new(dir.path())
        .with_hint(DeviceYmlSource::File(Some(yml)))
        .without_common_registers();
    let schema = resolve_device_schema(&params, &HarpSettings::default()).unwrap();
    assert_eq!(schema.who_am_i, 1140);
    assert_eq!(schema.registers.len(), 1);
    assert_eq!(schema.registers["Flow"].length, Some(2));
}

#[test]
fn test_qc_suite_over_loaded_device() {
    let dir = device_dir();
    let params = HarpDeviceReaderParams::new(dir.path());
    let schema = resolve_device_schema(&params, &HarpSettings::default()).unwrap();
    let mut root = Node::from(harp_device("Olfactometer", params, HarpSettings::default()).unwrap());
    load_branch(&mut root, false).unwrap();
    let device = root.as_collection().unwrap();

    let mut runner = Runner::new();
    runner.add_suite(HarpDeviceSuite::new(device, &schema).into_suite());
    let results = runner.run_all();

    let status = |name: &str| {
        results
            .iter()
            .find(|r| r.test_name == name)
            .map(|r| r.status)
            .unwrap()
    };
    assert_eq!(status("has_whoami"), Status::Passed);
    assert_eq!(status("match_whoami_to_yml"), Status::Passed);
    // Only two of the sixteen registers were dumped.
    assert_eq!(status("read_dump_is_complete"), Status::Failed);
    assert_eq!(status("request_response"), Status::Skipped);
    assert_eq!(status("monotonicity"), Status::Passed);

    let stats = ResultsStatistics::from_results(&results);
    assert_eq!((stats.passed, stats.failed, stats.skipped), (3, 1, 1));
}
