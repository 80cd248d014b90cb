//! Device schemas and the reader that turns a harp device folder into register streams.

use super::message::{PayloadType, RegisterData};
use super::whoami;
use crate::config::HarpSettings;
use crate::error::{AppResult, ContractError};
use crate::stream::{DataStream, DataStreamCollection, Node, Params, Payload, Reader};
use chrono::{DateTime, Utc};
use glob::Pattern;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the schema file looked up next to the register dumps.
pub const DEVICE_YML: &str = "device.yml";

/// One register entry of a `device.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSpec {
    /// Register address.
    pub address: u8,
    /// Payload type name as written in `device.yml`, e.g. `U16`.
    #[serde(rename = "type")]
    pub payload_type: String,
    /// Number of values, when fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RegisterSpec {
    fn new(address: u8, payload_type: &str, description: &str) -> Self {
        Self {
            address,
            payload_type: payload_type.to_string(),
            length: None,
            description: Some(description.to_string()),
        }
    }

    /// Parsed payload type; `None` for names the codec does not know.
    pub fn payload_type(&self) -> Option<PayloadType> {
        PayloadType::from_name(&self.payload_type)
    }
}

/// Parsed `device.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSchema {
    /// Device name; register dumps are named `<device>_<address>.bin`.
    pub device: String,
    /// Device identifier.
    pub who_am_i: u16,
    /// Firmware version the schema describes.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub firmware_version: Option<String>,
    /// Hardware version the schema describes.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub hardware_targets: Option<String>,
    /// Registers by name, in declaration order.
    #[serde(default)]
    pub registers: IndexMap<String, RegisterSpec>,
}

// Versions show up as `0.2`, `"0.2"` or `1` depending on who wrote the file.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(serde_yaml::to_string(&other).unwrap_or_default().trim().to_string()),
    })
}

impl DeviceSchema {
    /// Parses a `device.yml` document.
    pub fn from_yaml_str(text: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads and parses a `device.yml` file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    /// Puts the core registers first. Registers declared by the device win on a name clash.
    pub fn with_common_registers(mut self) -> Self {
        let mut merged = common_registers();
        for (name, spec) in self.registers.drain(..) {
            merged.insert(name, spec);
        }
        self.registers = merged;
        self
    }

    /// Register dump location for `register` under `base`.
    pub fn register_file(&self, base: &Path, register: &RegisterSpec) -> PathBuf {
        base.join(format!("{}_{}.bin", self.device, register.address))
    }
}

/// Registers every harp device implements.
pub fn common_registers() -> IndexMap<String, RegisterSpec> {
    [
        ("WhoAmI", 0, "U16", "Specifies the identity class of the device."),
        ("HardwareVersionHigh", 1, "U8", "Specifies the major hardware version of the device."),
        ("HardwareVersionLow", 2, "U8", "Specifies the minor hardware version of the device."),
        ("AssemblyVersion", 3, "U8", "Specifies the version of the assembled components in the device."),
        ("CoreVersionHigh", 4, "U8", "Specifies the major version of the Harp core implemented by the device."),
        ("CoreVersionLow", 5, "U8", "Specifies the minor version of the Harp core implemented by the device."),
        ("FirmwareVersionHigh", 6, "U8", "Specifies the major version of the firmware currently installed."),
        ("FirmwareVersionLow", 7, "U8", "Specifies the minor version of the firmware currently installed."),
        ("TimestampSeconds", 8, "U32", "Stores the integral part of the system timestamp, in seconds."),
        ("TimestampMicroseconds", 9, "U16", "Stores the fractional part of the system timestamp, in microseconds."),
        ("OperationControl", 10, "U8", "Stores the configuration mode of the device."),
        ("ResetDevice", 11, "U8", "Resets the device and saves non-volatile registers."),
        ("DeviceName", 12, "U8", "Stores the user-specified device name."),
        ("SerialNumber", 13, "U16", "Specifies the unique serial number of the device."),
        ("ClockConfiguration", 14, "U8", "Specifies the configuration for the device synchronization clock."),
    ]
    .into_iter()
    .map(|(name, address, ty, description)| {
        (name.to_string(), RegisterSpec::new(address, ty, description))
    })
    .collect()
}

/// How to find the schema of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceYmlSource {
    /// A local file; `None` means `device.yml` next to the register dumps.
    File(Option<PathBuf>),
    /// Look the device up in the whoami list.
    WhoAmI(u16),
    /// Fetch the schema from this URL.
    Url(String),
    /// Read WhoAmI from the first register-0 dump matched by these patterns.
    Register0 { glob_patterns: Vec<String> },
}

impl Default for DeviceYmlSource {
    fn default() -> Self {
        Self::File(None)
    }
}

impl DeviceYmlSource {
    /// Register 0 lookup with the default dump patterns.
    pub fn register0() -> Self {
        Self::Register0 {
            glob_patterns: vec!["*_0.bin".to_string(), "*whoami*.bin".to_string()],
        }
    }
}

/// Parameters for [`harp_device_reader`].
#[derive(Debug, Clone, PartialEq)]
pub struct HarpDeviceReaderParams {
    /// Folder holding the register dumps, or any file inside it.
    pub path: PathBuf,
    /// Where to find the device schema.
    pub device_yml_hint: DeviceYmlSource,
    /// Merge in the registers every harp device shares.
    pub include_common_registers: bool,
    /// Wall-clock origin for device time.
    pub epoch: Option<DateTime<Utc>>,
}

impl HarpDeviceReaderParams {
    /// Device folder (or a file inside it) with the default schema hint.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            device_yml_hint: DeviceYmlSource::default(),
            include_common_registers: true,
            epoch: None,
        }
    }

    /// Where to find the device schema.
    pub fn with_hint(mut self, hint: DeviceYmlSource) -> Self {
        self.device_yml_hint = hint;
        self
    }

    /// Only expose the registers declared by the device itself.
    pub fn without_common_registers(mut self) -> Self {
        self.include_common_registers = false;
        self
    }

    /// Wall-clock origin used by [`RegisterData::datetimes`].
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Directory the register dumps live in.
    pub fn base_dir(&self) -> &Path {
        if self.path.is_dir() {
            &self.path
        } else {
            self.path.parent().unwrap_or_else(|| Path::new("."))
        }
    }
}

impl Params for HarpDeviceReaderParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Parameters for [`harp_register_reader`].
#[derive(Debug, Clone, PartialEq)]
pub struct HarpRegisterParams {
    /// Register dump file.
    pub path: PathBuf,
    /// Register address.
    pub address: u8,
    /// Wall-clock origin for device time.
    pub epoch: Option<DateTime<Utc>>,
}

impl Params for HarpRegisterParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Decodes one register dump.
pub fn read_register(params: &HarpRegisterParams) -> AppResult<RegisterData> {
    let bytes = fs::read(&params.path)?;
    Ok(RegisterData::decode(params.address, &bytes)?.with_epoch(params.epoch))
}

/// Reader decoding one register dump into [`Payload::Harp`].
pub fn harp_register_reader() -> Reader<Payload> {
    Reader::new("harp_register", |params: &HarpRegisterParams| {
        read_register(params).map(Payload::Harp)
    })
}

/// Finds and parses the schema named by `params.device_yml_hint`.
pub fn resolve_device_schema(
    params: &HarpDeviceReaderParams,
    settings: &HarpSettings,
) -> AppResult<DeviceSchema> {
    let schema = match &params.device_yml_hint {
        DeviceYmlSource::File(path) => {
            let path = path
                .clone()
                .unwrap_or_else(|| params.base_dir().join(DEVICE_YML));
            DeviceSchema::from_file(&path)?
        }
        DeviceYmlSource::WhoAmI(who_am_i) => {
            DeviceSchema::from_yaml_str(&whoami::fetch_device_yml(*who_am_i, settings)?)?
        }
        DeviceYmlSource::Url(url) => {
            DeviceSchema::from_yaml_str(&whoami::fetch_text(url, settings)?)?
        }
        DeviceYmlSource::Register0 { glob_patterns } => {
            let who_am_i = who_am_i_from_dump(params.base_dir(), glob_patterns)?;
            DeviceSchema::from_yaml_str(&whoami::fetch_device_yml(who_am_i, settings)?)?
        }
    };
    Ok(if params.include_common_registers {
        schema.with_common_registers()
    } else {
        schema
    })
}

/// WhoAmI value stored in the first register-0 dump matched under `dir`.
pub fn who_am_i_from_dump(dir: &Path, glob_patterns: &[String]) -> AppResult<u16> {
    let root = Pattern::escape(&dir.to_string_lossy());
    let mut candidates = Vec::new();
    for pattern in glob_patterns {
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
        let mut hits = glob::glob(&full)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        hits.sort();
        candidates.extend(hits);
    }
    let file = candidates.first().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "No WhoAmI register dump in '{}' matching {glob_patterns:?}",
                dir.display()
            ),
        )
    })?;
    debug!(file = %file.display(), "reading WhoAmI from register dump");

    let data = RegisterData::decode(0, &fs::read(file)?)?;
    let value = data
        .messages
        .first()
        .and_then(|m| m.values.first_u64())
        .ok_or_else(|| {
            ContractError::Harp(format!("'{}' holds no WhoAmI value", file.display()))
        })?;
    u16::try_from(value)
        .map_err(|_| ContractError::Harp(format!("WhoAmI value {value} is out of range")))
}

/// Reader for a dynamic collection with one leaf per register of the device schema.
pub fn harp_device_reader(settings: HarpSettings) -> Reader<Vec<Node>> {
    Reader::new("harp_device", move |params: &HarpDeviceReaderParams| {
        let schema = resolve_device_schema(params, &settings)?;
        let base = params.base_dir();
        debug!(
            device = %schema.device,
            registers = schema.registers.len(),
            "resolved harp device schema"
        );
        schema
            .registers
            .iter()
            .map(|(name, spec)| {
                let mut builder = DataStream::builder(name.as_str())
                    .reader(harp_register_reader())
                    .reader_params(HarpRegisterParams {
                        path: schema.register_file(base, spec),
                        address: spec.address,
                        epoch: params.epoch,
                    });
                if let Some(description) = &spec.description {
                    builder = builder.description(description);
                }
                builder.build().map(Node::Stream)
            })
            .collect()
    })
}

/// A dynamic collection over a harp device folder. Nothing is read until it is loaded.
pub fn harp_device(
    name: &str,
    params: HarpDeviceReaderParams,
    settings: HarpSettings,
) -> AppResult<DataStreamCollection> {
    DataStreamCollection::new(name, harp_device_reader(settings))?.with_reader_params(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harp::message::{HarpMessage, MessageType, PayloadValues};

    const BEHAVIOR_YML: &str = "\
device: Behavior
whoAmI: 1216
firmwareVersion: 0.2
hardwareTargets: '1.1'
registers:
  DigitalInputState:
    address: 32
    type: U8
    access: Event
    description: State of the digital input pins.
  OutputSet:
    address: 34
    type: U16
    access: Write
";

    fn write_dump(path: &Path, address: u8, values: PayloadValues) {
        let data = RegisterData::new(
            address,
            vec![HarpMessage {
                message_type: MessageType::Read,
                address,
                port: 255,
                timestamp: Some(1.0),
                values,
            }],
        );
        fs::write(path, data.encode().unwrap()).unwrap();
    }

    #[test]
    fn schema_parses_with_loose_versions() {
        let schema = DeviceSchema::from_yaml_str(BEHAVIOR_YML).unwrap();
        assert_eq!(schema.device, "Behavior");
        assert_eq!(schema.who_am_i, 1216);
        assert_eq!(schema.firmware_version.as_deref(), Some("0.2"));
        assert_eq!(schema.hardware_targets.as_deref(), Some("1.1"));
        assert_eq!(
            schema.registers["OutputSet"].payload_type(),
            Some(PayloadType::U16)
        );
    }

    #[test]
    fn common_registers_come_first() {
        let schema = DeviceSchema::from_yaml_str(BEHAVIOR_YML)
            .unwrap()
            .with_common_registers();
        let names: Vec<&str> = schema.registers.keys().map(String::as_str).collect();
        assert_eq!(names.len(), 17);
        assert_eq!(names[0], "WhoAmI");
        assert_eq!(names[14], "ClockConfiguration");
        assert_eq!(names[15], "DigitalInputState");
    }

    #[test]
    fn device_reader_builds_one_leaf_per_register() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEVICE_YML), BEHAVIOR_YML).unwrap();
        write_dump(
            &dir.path().join("Behavior_32.bin"),
            32,
            PayloadValues::U8(vec![3]),
        );

        let params = HarpDeviceReaderParams::new(dir.path()).without_common_registers();
        let mut device = harp_device("Behavior", params, HarpSettings::default()).unwrap();
        device.load().unwrap();
        assert_eq!(device.streams().unwrap().len(), 2);

        let node = device.at_mut("DigitalInputState").unwrap();
        assert!(!node.has_data());
        node.load().unwrap();
        let data = node.data().unwrap().as_harp().unwrap();
        assert_eq!(data.address, 32);
        assert_eq!(data.messages[0].values, PayloadValues::U8(vec![3]));

        let missing = device.at_mut("OutputSet").unwrap().load().unwrap_err();
        assert_eq!(missing.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn base_dir_of_a_file_is_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Behavior_0.bin");
        fs::write(&file, b"").unwrap();
        assert_eq!(HarpDeviceReaderParams::new(&file).base_dir(), dir.path());
    }

    #[test]
    fn who_am_i_is_read_from_register_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            &dir.path().join("Behavior_0.bin"),
            0,
            PayloadValues::U16(vec![1216]),
        );
        let DeviceYmlSource::Register0 { glob_patterns } = DeviceYmlSource::register0() else {
            panic!("register0 hint expected");
        };
        assert_eq!(who_am_i_from_dump(dir.path(), &glob_patterns).unwrap(), 1216);
    }

    #[test]
    fn missing_register_zero_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = who_am_i_from_dump(dir.path(), &["*_0.bin".to_string()]).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }
}
