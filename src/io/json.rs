//! JSON readers and writer.

use crate::error::{AppResult, ContractError};
use crate::stream::{Params, Payload, Reader, Writer};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters for [`json_reader`] and [`multi_line_json_reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonReaderParams {
    /// File to read.
    pub path: PathBuf,
}

impl JsonReaderParams {
    /// Reads `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Params for JsonReaderParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Parameters for [`json_writer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonWriterParams {
    /// File to write.
    pub path: PathBuf,
    /// Spaces per indentation level.
    pub indent: usize,
}

impl JsonWriterParams {
    /// Writes `path` with a four-space indent.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            indent: 4,
        }
    }
}

impl Params for JsonWriterParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Parses the whole file as one JSON document.
pub fn read_json(params: &JsonReaderParams) -> AppResult<Value> {
    let text = fs::read_to_string(&params.path)?;
    Ok(serde_json::from_str(&text)?)
}

/// One document per non-blank line, collected into an array.
pub fn read_multi_line_json(params: &JsonReaderParams) -> AppResult<Value> {
    let text = fs::read_to_string(&params.path)?;
    let docs = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(Value::Array(docs))
}

/// Writes `data` with the configured indent.
pub fn write_json(data: &Value, params: &JsonWriterParams) -> AppResult<()> {
    let indent = " ".repeat(params.indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(data, &mut serializer)?;
    fs::write(&params.path, buf)?;
    Ok(())
}

/// Reader named `json` producing [`Payload::Json`].
pub fn json_reader() -> Reader<Payload> {
    Reader::new("json", |params: &JsonReaderParams| read_json(params).map(Payload::Json))
}

/// Reader named `multi_line_json`; one document per non-blank line, collected into an array.
pub fn multi_line_json_reader() -> Reader<Payload> {
    Reader::new("multi_line_json", |params: &JsonReaderParams| {
        read_multi_line_json(params).map(Payload::Json)
    })
}

/// Writer named `json` accepting [`Payload::Json`].
pub fn json_writer() -> Writer<Payload> {
    Writer::new("json", |data: &Payload, params: &JsonWriterParams| {
        let value = data.as_json().ok_or_else(|| {
            ContractError::Source(format!(
                "JSON writer expects a JSON value, got {}",
                data.type_name()
            ))
        })?;
        write_json(value, params)
    })
}
