//! Binary Harp messages and register dumps.
//!
//! A register file is a plain concatenation of messages:
//!
//! ```text
//! [type, length, address, port, payload_type, (seconds:u32, ticks:u16)?, payload.., checksum]
//! ```
//!
//! `length` counts every byte after itself, the checksum is the byte sum of everything
//! before it, and timestamps are `seconds + ticks * 32µs`. Multi-byte fields are
//! little-endian.

use crate::error::{AppResult, ContractError};
use bytes::{Buf, BufMut};
use chrono::{DateTime, Duration, Utc};

const TIMESTAMP_FLAG: u8 = 0x10;
const ERROR_FLAG: u8 = 0x08;
const TICK_SECONDS: f64 = 32e-6;

/// Kind of a Harp message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Reply to a read command.
    Read,
    /// Reply to a write command.
    Write,
    /// Unsolicited event.
    Event,
    /// Failed read.
    ReadError,
    /// Failed write.
    WriteError,
}

impl MessageType {
    /// Parses the type byte, with or without the error flag.
    pub fn from_byte(byte: u8) -> AppResult<Self> {
        match byte {
            1 => Ok(Self::Read),
            2 => Ok(Self::Write),
            3 => Ok(Self::Event),
            b if b == 1 | ERROR_FLAG => Ok(Self::ReadError),
            b if b == 2 | ERROR_FLAG => Ok(Self::WriteError),
            other => Err(ContractError::Harp(format!("Unknown message type {other:#04x}"))),
        }
    }

    /// Wire byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
            Self::Event => 3,
            Self::ReadError => 1 | ERROR_FLAG,
            Self::WriteError => 2 | ERROR_FLAG,
        }
    }

    /// True for the `ReadError`/`WriteError` replies.
    pub fn is_error(self) -> bool {
        matches!(self, Self::ReadError | Self::WriteError)
    }

    /// Upper-case label, e.g. `READ`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Event => "EVENT",
            Self::ReadError => "READ_ERROR",
            Self::WriteError => "WRITE_ERROR",
        }
    }
}

/// Element type of a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Unsigned 8-bit.
    U8,
    /// Signed 8-bit.
    S8,
    /// Unsigned 16-bit.
    U16,
    /// Signed 16-bit.
    S16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 32-bit.
    S32,
    /// Unsigned 64-bit.
    U64,
    /// Signed 64-bit.
    S64,
    /// 32-bit float.
    Float,
}

impl PayloadType {
    /// Parses the payload type byte, ignoring the timestamp flag.
    pub fn from_byte(byte: u8) -> AppResult<Self> {
        match byte & !TIMESTAMP_FLAG {
            0x01 => Ok(Self::U8),
            0x81 => Ok(Self::S8),
            0x02 => Ok(Self::U16),
            0x82 => Ok(Self::S16),
            0x04 => Ok(Self::U32),
            0x84 => Ok(Self::S32),
            0x08 => Ok(Self::U64),
            0x88 => Ok(Self::S64),
            0x44 => Ok(Self::Float),
            other => Err(ContractError::Harp(format!("Unknown payload type {other:#04x}"))),
        }
    }

    /// Wire byte, without the timestamp flag.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::U8 => 0x01,
            Self::S8 => 0x81,
            Self::U16 => 0x02,
            Self::S16 => 0x82,
            Self::U32 => 0x04,
            Self::S32 => 0x84,
            Self::U64 => 0x08,
            Self::S64 => 0x88,
            Self::Float => 0x44,
        }
    }

    /// Parses the type names used by `device.yml` (`U8`, `S16`, `Float`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "U8" => Some(Self::U8),
            "S8" => Some(Self::S8),
            "U16" => Some(Self::U16),
            "S16" => Some(Self::S16),
            "U32" => Some(Self::U32),
            "S32" => Some(Self::S32),
            "U64" => Some(Self::U64),
            "S64" => Some(Self::S64),
            "Float" => Some(Self::Float),
            _ => None,
        }
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::Float => 4,
            Self::U64 | Self::S64 => 8,
        }
    }
}

/// Decoded payload elements.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValues {
    /// Unsigned 8-bit values.
    U8(Vec<u8>),
    /// Signed 8-bit values.
    S8(Vec<i8>),
    /// Unsigned 16-bit values.
    U16(Vec<u16>),
    /// Signed 16-bit values.
    S16(Vec<i16>),
    /// Unsigned 32-bit values.
    U32(Vec<u32>),
    /// Signed 32-bit values.
    S32(Vec<i32>),
    /// Unsigned 64-bit values.
    U64(Vec<u64>),
    /// Signed 64-bit values.
    S64(Vec<i64>),
    /// 32-bit float values.
    Float(Vec<f32>),
}

impl PayloadValues {
    /// Payload type matching the stored values.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::U8(_) => PayloadType::U8,
            Self::S8(_) => PayloadType::S8,
            Self::U16(_) => PayloadType::U16,
            Self::S16(_) => PayloadType::S16,
            Self::U32(_) => PayloadType::U32,
            Self::S32(_) => PayloadType::S32,
            Self::U64(_) => PayloadType::U64,
            Self::S64(_) => PayloadType::S64,
            Self::Float(_) => PayloadType::Float,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::S8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::S16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::S32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::S64(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    /// True if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All elements widened to `f64`.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::S8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::S16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::S32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::S64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }

    /// First element as an unsigned integer, if it is one.
    pub fn first_u64(&self) -> Option<u64> {
        match self {
            Self::U8(v) => v.first().map(|&x| u64::from(x)),
            Self::U16(v) => v.first().map(|&x| u64::from(x)),
            Self::U32(v) => v.first().map(|&x| u64::from(x)),
            Self::U64(v) => v.first().copied(),
            _ => None,
        }
    }

    fn decode(payload_type: PayloadType, mut body: &[u8]) -> Self {
        match payload_type {
            PayloadType::U8 => Self::U8(body.to_vec()),
            PayloadType::S8 => Self::S8(body.iter().map(|&b| b as i8).collect()),
            PayloadType::U16 => Self::U16(drain(&mut body, Buf::get_u16_le)),
            PayloadType::S16 => Self::S16(drain(&mut body, Buf::get_i16_le)),
            PayloadType::U32 => Self::U32(drain(&mut body, Buf::get_u32_le)),
            PayloadType::S32 => Self::S32(drain(&mut body, Buf::get_i32_le)),
            PayloadType::U64 => Self::U64(drain(&mut body, Buf::get_u64_le)),
            PayloadType::S64 => Self::S64(drain(&mut body, Buf::get_i64_le)),
            PayloadType::Float => Self::Float(drain(&mut body, Buf::get_f32_le)),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::U8(v) => out.put_slice(v),
            Self::S8(v) => v.iter().for_each(|&x| out.put_i8(x)),
            Self::U16(v) => v.iter().for_each(|&x| out.put_u16_le(x)),
            Self::S16(v) => v.iter().for_each(|&x| out.put_i16_le(x)),
            Self::U32(v) => v.iter().for_each(|&x| out.put_u32_le(x)),
            Self::S32(v) => v.iter().for_each(|&x| out.put_i32_le(x)),
            Self::U64(v) => v.iter().for_each(|&x| out.put_u64_le(x)),
            Self::S64(v) => v.iter().for_each(|&x| out.put_i64_le(x)),
            Self::Float(v) => v.iter().for_each(|&x| out.put_f32_le(x)),
        }
    }
}

fn drain<'b, T>(body: &mut &'b [u8], get: fn(&mut &'b [u8]) -> T) -> Vec<T> {
    let mut values = Vec::new();
    while body.has_remaining() {
        values.push(get(body));
    }
    values
}

/// One decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct HarpMessage {
    /// Kind of message.
    pub message_type: MessageType,
    /// Register address.
    pub address: u8,
    /// Device port; 255 for the device itself.
    pub port: u8,
    /// Device time in seconds, when the message carries a timestamp.
    pub timestamp: Option<f64>,
    /// Decoded payload.
    pub values: PayloadValues,
}

impl HarpMessage {
    /// Wall-clock time of the message, counting device time from `epoch`.
    pub fn datetime(&self, epoch: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let seconds = self.timestamp?;
        let micros = (seconds * 1e6).round() as i64;
        epoch.checked_add_signed(Duration::microseconds(micros))
    }

    /// Appends the wire form of this message to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) -> AppResult<()> {
        let mut payload = Vec::new();
        self.values.encode(&mut payload);
        let clock = self.timestamp.map(split_timestamp).transpose()?;
        let timestamp_len = if clock.is_some() { 6 } else { 0 };
        let length = u8::try_from(3 + timestamp_len + payload.len() + 1).map_err(|_| {
            ContractError::Harp(format!("Payload of {} bytes is too long", payload.len()))
        })?;

        let start = out.len();
        out.put_u8(self.message_type.as_byte());
        out.put_u8(length);
        out.put_u8(self.address);
        out.put_u8(self.port);
        let mut payload_type = self.values.payload_type().as_byte();
        if self.timestamp.is_some() {
            payload_type |= TIMESTAMP_FLAG;
        }
        out.put_u8(payload_type);
        if let Some((seconds, ticks)) = clock {
            out.put_u32_le(seconds);
            out.put_u16_le(ticks);
        }
        out.put_slice(&payload);
        let checksum = checksum(&out[start..]);
        out.put_u8(checksum);
        Ok(())
    }
}

/// Splits device time into whole seconds and 32 µs ticks.
fn split_timestamp(ts: f64) -> AppResult<(u32, u16)> {
    let out_of_range =
        || ContractError::Harp(format!("Timestamp {ts} is outside the device clock range"));
    if !ts.is_finite() || ts < 0.0 {
        return Err(out_of_range());
    }
    let mut seconds = ts.trunc();
    let mut ticks = ((ts - seconds) / TICK_SECONDS).round();
    if ticks * TICK_SECONDS >= 1.0 {
        seconds += 1.0;
        ticks = 0.0;
    }
    if seconds > f64::from(u32::MAX) {
        return Err(out_of_range());
    }
    // Both values are range-checked above.
    Ok((seconds as u32, ticks as u16))
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Decodes a whole register dump.
pub fn decode_messages(bytes: &[u8]) -> AppResult<Vec<HarpMessage>> {
    let mut messages = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < 2 {
            return Err(ContractError::Harp(format!("Truncated message header at byte {offset}")));
        }
        let total = usize::from(rest[1]) + 2;
        if rest.len() < total {
            return Err(ContractError::Harp(format!(
                "Message at byte {offset} declares {total} bytes but only {} remain",
                rest.len()
            )));
        }
        let frame = &rest[..total];
        let expected = frame[total - 1];
        if checksum(&frame[..total - 1]) != expected {
            return Err(ContractError::Harp(format!("Checksum mismatch at byte {offset}")));
        }
        messages.push(decode_frame(frame, offset)?);
        offset += total;
    }
    Ok(messages)
}

fn decode_frame(frame: &[u8], offset: usize) -> AppResult<HarpMessage> {
    let mut body = &frame[..frame.len() - 1];
    if body.len() < 5 {
        return Err(ContractError::Harp(format!("Message at byte {offset} is too short")));
    }
    let message_type = MessageType::from_byte(body.get_u8())?;
    body.advance(1);
    let address = body.get_u8();
    let port = body.get_u8();
    let raw_type = body.get_u8();
    let payload_type = PayloadType::from_byte(raw_type)?;

    let timestamp = if raw_type & TIMESTAMP_FLAG != 0 {
        if body.remaining() < 6 {
            return Err(ContractError::Harp(format!(
                "Message at byte {offset} is missing its timestamp"
            )));
        }
        let seconds = body.get_u32_le();
        let ticks = body.get_u16_le();
        Some(f64::from(seconds) + f64::from(ticks) * TICK_SECONDS)
    } else {
        None
    };

    if body.remaining() % payload_type.size() != 0 {
        return Err(ContractError::Harp(format!(
            "Payload of message at byte {offset} is not a whole number of {payload_type:?} values"
        )));
    }

    Ok(HarpMessage {
        message_type,
        address,
        port,
        timestamp,
        values: PayloadValues::decode(payload_type, body),
    })
}

/// All messages read from one register file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterData {
    /// Register address.
    pub address: u8,
    /// Messages in file order.
    pub messages: Vec<HarpMessage>,
    /// Wall-clock time at which device time zero begins.
    pub epoch: Option<DateTime<Utc>>,
}

impl RegisterData {
    /// Messages of register `address`, without an epoch.
    pub fn new(address: u8, messages: Vec<HarpMessage>) -> Self {
        Self {
            address,
            messages,
            epoch: None,
        }
    }

    /// Sets the origin used by [`RegisterData::datetimes`].
    pub fn with_epoch(mut self, epoch: Option<DateTime<Utc>>) -> Self {
        self.epoch = epoch;
        self
    }

    /// Decodes a dump of register `address`.
    pub fn decode(address: u8, bytes: &[u8]) -> AppResult<Self> {
        Ok(Self::new(address, decode_messages(bytes)?))
    }

    /// Wire form of every message, in order.
    pub fn encode(&self) -> AppResult<Vec<u8>> {
        let mut out = Vec::new();
        for message in &self.messages {
            message.encode(&mut out)?;
        }
        Ok(out)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if the dump holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages of one type, in file order.
    pub fn of_type(&self, message_type: MessageType) -> impl Iterator<Item = &HarpMessage> {
        self.messages
            .iter()
            .filter(move |m| m.message_type == message_type)
    }

    /// Most recent message of one type.
    pub fn last_of_type(&self, message_type: MessageType) -> Option<&HarpMessage> {
        self.of_type(message_type).last()
    }

    /// Timestamps of the messages of one type, in file order.
    pub fn timestamps(&self, message_type: MessageType) -> Vec<f64> {
        self.of_type(message_type).filter_map(|m| m.timestamp).collect()
    }

    /// Wall-clock times of the messages of one type. Empty without an epoch.
    pub fn datetimes(&self, message_type: MessageType) -> Vec<DateTime<Utc>> {
        match self.epoch {
            Some(epoch) => self
                .of_type(message_type)
                .filter_map(|m| m.datetime(epoch))
                .collect(),
            None => Vec::new(),
        }
    }
}
