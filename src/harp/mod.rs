//! Harp device integration.
//!
//! A harp device folder holds one binary dump per register, named
//! `<device>_<address>.bin`. [`harp_device_reader`] resolves the device schema
//! (`device.yml`), then exposes every register as a lazily loaded leaf whose payload
//! is [`Payload::Harp`](crate::stream::Payload::Harp).

pub mod device;
pub mod message;
pub mod whoami;

pub use device::{
    common_registers, harp_device, harp_device_reader, harp_register_reader,
    resolve_device_schema, DeviceSchema, DeviceYmlSource, HarpDeviceReaderParams,
    HarpRegisterParams, RegisterSpec,
};
pub use message::{
    decode_messages, HarpMessage, MessageType, PayloadType, PayloadValues, RegisterData,
};
