//! State shared by leaf streams and collections.

use crate::error::{AppResult, ContractError};
use crate::slot::Slot;
use crate::stream::params::{Params, Reader, Writer};
use crate::validation;

/// Reader/writer bindings plus the data slot of one node.
///
/// `R` is what the reader produces and `D` is what the node stores. They are the same
/// for leaves; a dynamic collection reads a list of nodes and stores them by name.
#[derive(Debug)]
pub(crate) struct StreamCore<R, D> {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) reader: Slot<Reader<R>>,
    pub(crate) writer: Slot<Writer<D>>,
    pub(crate) reader_params: Slot<Box<dyn Params>>,
    pub(crate) writer_params: Slot<Box<dyn Params>>,
    pub(crate) data: Slot<D>,
}

impl<R: 'static, D: 'static> StreamCore<R, D> {
    pub(crate) fn new(name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        validation::is_valid_stream_name(&name).map_err(|reason| {
            ContractError::Configuration(format!("Invalid stream name '{name}': {reason}"))
        })?;
        Ok(Self {
            name,
            description: None,
            reader: Slot::Unset,
            writer: Slot::Unset,
            reader_params: Slot::Unset,
            writer_params: Slot::Unset,
            data: Slot::Unset,
        })
    }

    pub(crate) fn bind_reader_params(&mut self, params: Box<dyn Params>) -> AppResult<()> {
        if self.reader.is_unset() {
            return Err(ContractError::Configuration(format!(
                "Reader is not set for '{}'. Cannot bind parameters.",
                self.name
            )));
        }
        if self.reader_params.is_bound() {
            return Err(ContractError::Configuration(format!(
                "Reader parameters are already set for '{}'. Cannot bind again.",
                self.name
            )));
        }
        self.reader_params.replace(params);
        Ok(())
    }

    pub(crate) fn bind_writer_params(&mut self, params: Box<dyn Params>) -> AppResult<()> {
        if self.writer.is_unset() {
            return Err(ContractError::Configuration(format!(
                "Writer is not set for '{}'. Cannot bind parameters.",
                self.name
            )));
        }
        if self.writer_params.is_bound() {
            return Err(ContractError::Configuration(format!(
                "Writer parameters are already set for '{}'. Cannot bind again.",
                self.name
            )));
        }
        self.writer_params.replace(params);
        Ok(())
    }

    /// Runs the reader without touching the data slot.
    pub(crate) fn read(&self) -> AppResult<R> {
        let reader = self.reader.get().ok_or_else(|| {
            ContractError::Configuration(format!(
                "Reader is not set for '{}'. Cannot read data.",
                self.name
            ))
        })?;
        let params = self.reader_params.get().ok_or_else(|| {
            ContractError::Configuration(format!(
                "Reader parameters are not set for '{}'. Cannot read data.",
                self.name
            ))
        })?;
        reader.read(params.as_ref())
    }

    pub(crate) fn data(&self) -> AppResult<&D> {
        self.data.get().ok_or_else(|| {
            ContractError::State(format!("Data has not been loaded yet for '{}'.", self.name))
        })
    }

    /// Writes `data`, or the loaded data when `None`.
    pub(crate) fn write(&self, data: Option<&D>) -> AppResult<()> {
        let writer = self.writer.get().ok_or_else(|| {
            ContractError::Configuration(format!(
                "Writer is not set for '{}'. Cannot write data.",
                self.name
            ))
        })?;
        let params = self.writer_params.get().ok_or_else(|| {
            ContractError::Configuration(format!(
                "Writer parameters are not set for '{}'. Cannot write data.",
                self.name
            ))
        })?;
        let data = match data {
            Some(data) => data,
            None => self.data()?,
        };
        writer.write(data, params.as_ref())
    }

    pub(crate) fn reader_name(&self) -> Option<&str> {
        self.reader.get().map(Reader::name)
    }

    pub(crate) fn writer_name(&self) -> Option<&str> {
        self.writer.get().map(Writer::name)
    }

    pub(crate) fn reader_params(&self) -> Option<&dyn Params> {
        self.reader_params.get().map(|p| p.as_ref())
    }

    pub(crate) fn writer_params(&self) -> Option<&dyn Params> {
        self.writer_params.get().map(|p| p.as_ref())
    }
}
