//! Checks every harp device is expected to pass.

use super::{Outcome, Suite};
use crate::error::AppResult;
use crate::harp::{DeviceSchema, MessageType, RegisterData};
use crate::stream::{DataStream, DataStreamCollection};
use serde_json::json;

const WHO_AM_I: &str = "WhoAmI";
const OPERATION_CONTROL: &str = "OperationControl";

fn register_data(stream: &DataStream) -> Option<&RegisterData> {
    stream.data().ok().and_then(|payload| payload.as_harp())
}

/// Checks over a loaded harp device collection.
///
/// `commands` is the device holding the requests sent to the board; checks that need
/// it are skipped when it is absent.
#[derive(Debug, Clone, Copy)]
pub struct HarpDeviceSuite<'a> {
    device: &'a DataStreamCollection,
    schema: &'a DeviceSchema,
    commands: Option<&'a DataStreamCollection>,
}

impl<'a> HarpDeviceSuite<'a> {
    /// Checks `device` against `schema`.
    pub fn new(device: &'a DataStreamCollection, schema: &'a DeviceSchema) -> Self {
        Self {
            device,
            schema,
            commands: None,
        }
    }

    /// Device holding the commands sent to `device`, for the request/response check.
    pub fn with_commands(mut self, commands: &'a DataStreamCollection) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Registers every check on a [`Suite`] named `HarpDeviceSuite`.
    pub fn into_suite(self) -> Suite<'a> {
        Suite::new("HarpDeviceSuite")
            .test(
                "has_whoami",
                "Check that WhoAmI is loaded and holds a value in 0000-9999",
                move || self.has_whoami(),
            )
            .test(
                "match_whoami_to_yml",
                "Check that WhoAmI matches the device schema",
                move || self.match_whoami_to_yml(),
            )
            .test(
                "read_dump_is_complete",
                "Check that every schema register has a READ message",
                move || self.read_dump_is_complete(),
            )
            .test(
                "request_response",
                "Check that each request to the device has a corresponding response",
                move || self.request_response(),
            )
            .test(
                "monotonicity",
                "Check that register timestamps never decrease within a message type",
                move || self.monotonicity(),
            )
    }

    fn who_am_i(&self) -> AppResult<Option<u64>> {
        let node = self.device.at(WHO_AM_I)?;
        Ok(node
            .as_stream()
            .and_then(register_data)
            .and_then(|data| data.messages.last())
            .and_then(|m| m.values.first_u64()))
    }

    /// WhoAmI register holds a value in `0..=9999`.
    pub fn has_whoami(&self) -> AppResult<Outcome> {
        let node = self.device.at(WHO_AM_I)?;
        let Some(data) = node.as_stream().filter(|s| s.has_data()).and_then(register_data) else {
            return Ok(Outcome::fail("WhoAmI does not have loaded data"));
        };
        if data.is_empty() {
            return Ok(Outcome::fail("WhoAmI file is empty"));
        }
        Ok(match self.who_am_i()? {
            Some(value) if value <= 9999 => Outcome::pass("WhoAmI is present").with_result(value),
            Some(value) => {
                Outcome::fail("WhoAmI value is not in the range 0000-9999").with_result(value)
            }
            None => Outcome::fail("WhoAmI holds no integer value"),
        })
    }

    /// WhoAmI value matches the schema.
    pub fn match_whoami_to_yml(&self) -> AppResult<Outcome> {
        let expected = u64::from(self.schema.who_am_i);
        Ok(match self.who_am_i()? {
            Some(value) if value == expected => {
                Outcome::pass("WhoAmI value matches the device's WhoAmI").with_result(true)
            }
            found => Outcome::fail("WhoAmI value does not match the device's WhoAmI")
                .with_result(false)
                .with_context(json!({ "expected": expected, "found": found })),
        })
    }

    /// Every register has a read reply in its dump.
    pub fn read_dump_is_complete(&self) -> AppResult<Outcome> {
        let missing: Vec<&str> = self
            .device
            .walk_data_streams()
            .filter(|s| self.schema.registers.contains_key(s.name()))
            .filter(|s| {
                register_data(s)
                    .and_then(|d| d.last_of_type(MessageType::Read))
                    .is_none()
            })
            .map(DataStream::name)
            .collect();

        Ok(if missing.is_empty() {
            Outcome::pass("Read dump is complete").with_result(true)
        } else {
            Outcome::fail("Read dump is not complete")
                .with_result(false)
                .with_context(json!({ "missing_registers": missing }))
        })
    }

    /// Every write command got a reply.
    pub fn request_response(&self) -> AppResult<Outcome> {
        let Some(commands) = self.commands else {
            return Ok(Outcome::skip("No harp device commands provided"));
        };

        // Only traffic after the first OperationControl write is part of the session.
        let start = commands
            .at(OPERATION_CONTROL)
            .ok()
            .and_then(|n| n.as_stream())
            .and_then(register_data)
            .and_then(|d| d.timestamps(MessageType::Write).first().copied())
            .unwrap_or(f64::NEG_INFINITY);
        let writes_after = |data: Option<&RegisterData>| {
            data.map_or(0, |d| {
                d.timestamps(MessageType::Write)
                    .into_iter()
                    .filter(|t| *t >= start)
                    .count()
            })
        };

        let mut register_errors = Vec::new();
        for request in commands.walk_data_streams().filter(|s| s.has_data()) {
            let requests = writes_after(register_data(request));
            if requests == 0 {
                continue;
            }
            let reply = self
                .device
                .at(request.name())
                .ok()
                .and_then(|n| n.as_stream())
                .and_then(register_data);
            let responses = writes_after(reply);
            if requests != responses {
                register_errors.push(json!({
                    "register": request.name(),
                    "requests": requests,
                    "responses": responses,
                }));
            }
        }

        Ok(if register_errors.is_empty() {
            Outcome::pass(
                "Request/Response check passed. All requests have a corresponding response.",
            )
        } else {
            Outcome::fail(
                "Request/Response check failed. Some requests do not have a corresponding response.",
            )
            .with_context(json!({ "register_errors": register_errors }))
        })
    }

    /// Timestamps never go backwards within a message type.
    pub fn monotonicity(&self) -> AppResult<Outcome> {
        let mut register_errors = Vec::new();
        for stream in self.device.walk_data_streams() {
            let Some(data) = register_data(stream) else {
                continue;
            };
            let mut types: Vec<MessageType> = Vec::new();
            for message in &data.messages {
                if !types.contains(&message.message_type) {
                    types.push(message.message_type);
                }
            }
            for message_type in types {
                let timestamps = data.timestamps(message_type);
                if timestamps.windows(2).any(|w| w[1] < w[0]) {
                    register_errors.push(json!({
                        "register": stream.name(),
                        "message_type": message_type.as_str(),
                    }));
                }
            }
        }

        Ok(if register_errors.is_empty() {
            Outcome::pass("Monotonicity check passed. All registers are monotonic.")
        } else {
            Outcome::fail("Monotonicity check failed. Some registers are not monotonic.")
                .with_context(json!({ "register_errors": register_errors }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harp::{HarpMessage, PayloadValues};
    use crate::qc::Status;
    use crate::stream::{Node, NullParams, Payload, Reader};

    fn message(message_type: MessageType, address: u8, t: f64, value: u16) -> HarpMessage {
        HarpMessage {
            message_type,
            address,
            port: 255,
            timestamp: Some(t),
            values: PayloadValues::U16(vec![value]),
        }
    }

    fn register(name: &str, data: RegisterData) -> DataStream {
        let payload = Payload::Harp(data);
        let mut stream = DataStream::builder(name)
            .reader(Reader::new("fixture", move |_: &NullParams| Ok(payload.clone())))
            .reader_params(NullParams)
            .build()
            .unwrap();
        stream.load().unwrap();
        stream
    }

    fn schema(who_am_i: u16) -> DeviceSchema {
        DeviceSchema::from_yaml_str(&format!(
            "device: Test\nwhoAmI: {who_am_i}\nregisters:\n  Value:\n    address: 32\n    type: U16\n"
        ))
        .unwrap()
        .with_common_registers()
    }

    fn device(who_am_i: u16, value_messages: Vec<HarpMessage>) -> DataStreamCollection {
        DataStreamCollection::new_static(
            "Test",
            [
                Node::Stream(register(
                    WHO_AM_I,
                    RegisterData::new(0, vec![message(MessageType::Read, 0, 0.5, who_am_i)]),
                )),
                Node::Stream(register("Value", RegisterData::new(32, value_messages))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn whoami_checks_pass_on_matching_device() {
        let schema = schema(1216);
        let device = device(1216, vec![message(MessageType::Read, 32, 1.0, 0)]);
        let suite = HarpDeviceSuite::new(&device, &schema);
        let outcome = suite.has_whoami().unwrap();
        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(outcome.result, Some(json!(1216)));
        assert_eq!(suite.match_whoami_to_yml().unwrap().status, Status::Passed);
    }

    #[test]
    fn mismatched_whoami_fails() {
        let schema = schema(1216);
        let device = device(2048, Vec::new());
        let outcome = HarpDeviceSuite::new(&device, &schema)
            .match_whoami_to_yml()
            .unwrap();
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.context, Some(json!({"expected": 1216, "found": 2048})));
    }

    #[test]
    fn read_dump_reports_missing_registers() {
        let schema = schema(1216);
        let device = device(1216, vec![message(MessageType::Event, 32, 1.0, 0)]);
        let outcome = HarpDeviceSuite::new(&device, &schema)
            .read_dump_is_complete()
            .unwrap();
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.context, Some(json!({"missing_registers": ["Value"]})));
    }

    #[test]
    fn request_response_is_skipped_without_commands() {
        let schema = schema(1216);
        let device = device(1216, Vec::new());
        let results = HarpDeviceSuite::new(&device, &schema).into_suite().run();
        let parity = results
            .iter()
            .find(|r| r.test_name == "request_response")
            .unwrap();
        assert_eq!(parity.status, Status::Skipped);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn unanswered_requests_fail_parity() {
        let schema = schema(1216);
        let device = device(1216, vec![message(MessageType::Write, 32, 2.0, 1)]);
        let commands = DataStreamCollection::new_static(
            "TestCommands",
            [
                Node::Stream(register(
                    OPERATION_CONTROL,
                    RegisterData::new(10, vec![message(MessageType::Write, 10, 1.0, 0)]),
                )),
                Node::Stream(register(
                    "Value",
                    RegisterData::new(
                        32,
                        vec![
                            message(MessageType::Write, 32, 0.5, 1),
                            message(MessageType::Write, 32, 1.5, 1),
                            message(MessageType::Write, 32, 2.5, 1),
                        ],
                    ),
                )),
            ],
        )
        .unwrap();

        let outcome = HarpDeviceSuite::new(&device, &schema)
            .with_commands(&commands)
            .request_response()
            .unwrap();
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(
            outcome.context,
            Some(json!({"register_errors": [
                {"register": "OperationControl", "requests": 1, "responses": 0},
                {"register": "Value", "requests": 2, "responses": 1},
            ]}))
        );
    }

    #[test]
    fn timestamps_going_backwards_fail_monotonicity() {
        let schema = schema(1216);
        let device = device(
            1216,
            vec![
                message(MessageType::Event, 32, 2.0, 0),
                message(MessageType::Read, 32, 1.0, 0),
                message(MessageType::Event, 32, 1.5, 0),
            ],
        );
        let outcome = HarpDeviceSuite::new(&device, &schema).monotonicity().unwrap();
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(
            outcome.context,
            Some(json!({"register_errors": [{"register": "Value", "message_type": "EVENT"}]}))
        );
    }

    #[test]
    fn missing_whoami_register_is_an_error() {
        let schema = schema(1216);
        let empty = DataStreamCollection::new_static("Empty", Vec::<Node>::new())
            .unwrap();
        let results = HarpDeviceSuite::new(&empty, &schema).into_suite().run();
        assert_eq!(results[0].status, Status::Error);
    }
}
