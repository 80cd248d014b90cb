//! Leaf data streams.

use crate::error::AppResult;
use crate::stream::core::StreamCore;
use crate::stream::params::{Params, Reader, Writer};
use crate::stream::payload::Payload;
use std::fmt;
use tracing::debug;

/// A leaf node: one (reader, params) pair and optionally one (writer, params) pair.
///
/// Nothing is read until [`DataStream::load`] or [`DataStream::read`] is called. A
/// failed load leaves the node exactly as it was before the attempt.
#[derive(Debug)]
pub struct DataStream {
    core: StreamCore<Payload, Payload>,
}

impl DataStream {
    /// Creates a stream with nothing bound.
    pub fn new(name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            core: StreamCore::new(name)?,
        })
    }

    /// Starts a [`DataStreamBuilder`].
    pub fn builder(name: impl Into<String>) -> DataStreamBuilder {
        DataStreamBuilder::new(name)
    }

    /// Stream name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        self.core.description.as_deref()
    }

    /// Bound reader, if any.
    pub fn reader(&self) -> Option<&Reader<Payload>> {
        self.core.reader.get()
    }

    /// Bound writer, if any.
    pub fn writer(&self) -> Option<&Writer<Payload>> {
        self.core.writer.get()
    }

    /// Bound reader parameters.
    pub fn reader_params(&self) -> Option<&dyn Params> {
        self.core.reader_params()
    }

    /// Bound writer parameters.
    pub fn writer_params(&self) -> Option<&dyn Params> {
        self.core.writer_params()
    }

    /// Binds reader parameters. Fails if no reader is set or parameters are already bound.
    pub fn bind_reader_params<P: Params>(&mut self, params: P) -> AppResult<&mut Self> {
        self.core.bind_reader_params(Box::new(params))?;
        Ok(self)
    }

    pub(crate) fn bind_reader_params_boxed(&mut self, params: Box<dyn Params>) -> AppResult<()> {
        self.core.bind_reader_params(params)
    }

    /// Binds writer parameters. Fails if no writer is set or parameters are already bound.
    pub fn bind_writer_params<P: Params>(&mut self, params: P) -> AppResult<&mut Self> {
        self.core.bind_writer_params(Box::new(params))?;
        Ok(self)
    }

    /// True once a load has succeeded, even if the loaded payload is empty.
    pub fn has_data(&self) -> bool {
        self.core.data.is_bound()
    }

    /// The loaded payload, or a `State` error if nothing has been loaded.
    pub fn data(&self) -> AppResult<&Payload> {
        self.core.data()
    }

    /// Invokes the reader without storing the result.
    pub fn read(&self) -> AppResult<Payload> {
        self.core.read()
    }

    /// Reads and stores the result. Always re-runs the reader.
    pub fn load(&mut self) -> AppResult<&mut Self> {
        let payload = self.core.read()?;
        debug!(stream = %self.core.name, data_type = payload.type_name(), "loaded data stream");
        self.core.data.replace(payload);
        Ok(self)
    }

    /// Loads only when no data is present yet.
    pub fn load_if_unloaded(&mut self) -> AppResult<&mut Self> {
        if !self.has_data() {
            self.load()?;
        }
        Ok(self)
    }

    /// Writes `data`, or the loaded payload when `None`.
    pub fn write(&self, data: Option<&Payload>) -> AppResult<()> {
        self.core.write(data)
    }

    /// Drops the loaded payload, returning the node to its configured state.
    pub fn unload(&mut self) -> Option<Payload> {
        self.core.data.take()
    }
}

impl fmt::Display for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataStream(name={}, reader={}, writer={}, reader_params={:?}, writer_params={:?}, data={})",
            self.core.name,
            self.core.reader_name().unwrap_or("<Unset>"),
            self.core.writer_name().unwrap_or("<Unset>"),
            self.core.reader_params,
            self.core.writer_params,
            self.core
                .data
                .get()
                .map_or("Not Loaded", Payload::type_name),
        )
    }
}

/// A builder for constructing `DataStream` instances.
#[derive(Default)]
pub struct DataStreamBuilder {
    name: String,
    description: Option<String>,
    reader: Option<Reader<Payload>>,
    writer: Option<Writer<Payload>>,
    reader_params: Option<Box<dyn Params>>,
    writer_params: Option<Box<dyn Params>>,
}

impl DataStreamBuilder {
    /// Builder for a stream named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Sets the reader.
    pub fn reader(mut self, reader: Reader<Payload>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Sets the writer.
    pub fn writer(mut self, writer: Writer<Payload>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Parameters for the reader; binding them without a reader fails at `build`.
    pub fn reader_params<P: Params>(mut self, params: P) -> Self {
        self.reader_params = Some(Box::new(params));
        self
    }

    /// Parameters for the writer.
    pub fn writer_params<P: Params>(mut self, params: P) -> Self {
        self.writer_params = Some(Box::new(params));
        self
    }

    /// Validates the name and the parameter bindings.
    pub fn build(self) -> AppResult<DataStream> {
        let mut core = StreamCore::new(self.name)?;
        core.description = self.description;
        if let Some(reader) = self.reader {
            core.reader.replace(reader);
        }
        if let Some(writer) = self.writer {
            core.writer.replace(writer);
        }
        if let Some(params) = self.reader_params {
            core.bind_reader_params(params)?;
        }
        if let Some(params) = self.writer_params {
            core.bind_writer_params(params)?;
        }
        Ok(DataStream { core })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::stream::params::NullParams;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn constant(text: &'static str) -> Reader<Payload> {
        Reader::new("constant", move |_: &NullParams| Ok(Payload::Text(text.to_string())))
    }

    #[test]
    fn fresh_stream_has_no_data() {
        let stream = DataStream::builder("a")
            .reader(constant("x"))
            .reader_params(NullParams)
            .build()
            .unwrap();
        assert!(!stream.has_data());
        assert!(matches!(stream.data(), Err(ContractError::State(_))));
    }

    #[test]
    fn read_does_not_store() {
        let stream = DataStream::builder("a")
            .reader(constant("x"))
            .reader_params(NullParams)
            .build()
            .unwrap();
        assert_eq!(stream.read().unwrap().as_text(), Some("x"));
        assert!(!stream.has_data());
    }

    #[test]
    fn load_always_rereads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reader = Reader::new("count", move |_: &NullParams| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Payload::Text(n.to_string()))
        });
        let mut stream = DataStream::builder("a")
            .reader(reader)
            .reader_params(NullParams)
            .build()
            .unwrap();
        stream.load().unwrap();
        stream.load().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(stream.data().unwrap().as_text(), Some("2"));

        stream.load_if_unloaded().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_load_keeps_previous_state() {
        let fail = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fail);
        let reader = Reader::new("flaky", move |_: &NullParams| {
            if flag.load(Ordering::SeqCst) == 1 {
                Err(ContractError::Source("boom".into()))
            } else {
                Ok(Payload::Text("ok".into()))
            }
        });
        let mut stream = DataStream::builder("a")
            .reader(reader)
            .reader_params(NullParams)
            .build()
            .unwrap();

        fail.store(1, Ordering::SeqCst);
        assert!(stream.load().is_err());
        assert!(!stream.has_data());

        fail.store(0, Ordering::SeqCst);
        stream.load().unwrap();
        fail.store(1, Ordering::SeqCst);
        assert!(stream.load().is_err());
        assert_eq!(stream.data().unwrap().as_text(), Some("ok"));
    }

    #[test]
    fn binding_params_without_reader_fails() {
        let mut stream = DataStream::new("a").unwrap();
        let err = stream.bind_reader_params(NullParams).unwrap_err();
        assert!(matches!(err, ContractError::Configuration(_)));
        assert!(DataStream::builder("b").reader_params(NullParams).build().is_err());
    }

    #[test]
    fn binding_params_twice_fails() {
        let mut stream = DataStream::builder("a")
            .reader(constant("x"))
            .reader_params(NullParams)
            .build()
            .unwrap();
        assert!(stream.bind_reader_params(NullParams).is_err());
    }

    #[test]
    fn read_without_params_is_a_configuration_error() {
        let stream = DataStream::builder("a").reader(constant("x")).build().unwrap();
        assert!(matches!(stream.read(), Err(ContractError::Configuration(_))));
        let bare = DataStream::new("b").unwrap();
        assert!(matches!(bare.read(), Err(ContractError::Configuration(_))));
    }

    #[test]
    fn write_without_loaded_data_fails() {
        let writer = Writer::new("sink", |_: &Payload, _: &NullParams| Ok(()));
        let stream = DataStream::builder("a")
            .writer(writer)
            .writer_params(NullParams)
            .build()
            .unwrap();
        assert!(matches!(stream.write(None), Err(ContractError::State(_))));
        assert!(stream.write(Some(&Payload::Text("x".into()))).is_ok());
        assert!(matches!(
            DataStream::new("c").unwrap().write(None),
            Err(ContractError::Configuration(_))
        ));
    }

    #[test]
    fn display_summarises_bindings() {
        let mut stream = DataStream::builder("a")
            .reader(constant("x"))
            .reader_params(NullParams)
            .build()
            .unwrap();
        let text = stream.to_string();
        assert!(text.contains("reader=constant"));
        assert!(text.contains("writer=<Unset>"));
        assert!(text.contains("data=Not Loaded"));
        stream.load().unwrap();
        assert!(stream.to_string().contains("data=Text"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(DataStream::new("").is_err());
        assert!(DataStream::new("a/b").is_err());
    }
}
