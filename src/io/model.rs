//! Readers that validate JSON files against a typed model.
//!
//! The model type is any `serde` deserializable struct. A whole-file model is stored as
//! [`Payload::Model`] and recovered with [`Payload::as_model`]; line-delimited models
//! are validated one record at a time and tabulated.

use crate::error::{AppResult, ContractError};
use crate::stream::{ModelData, Params, Payload, Reader, Writer};
use crate::table;
use arrow::datatypes::{Field, Schema};
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parameters for [`model_reader`] and [`model_writer`].
pub struct ModelReaderParams<T> {
    /// Model file.
    pub path: PathBuf,
    model: PhantomData<fn() -> T>,
}

impl<T> ModelReaderParams<T> {
    /// Model file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            model: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ModelReaderParams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelReaderParams")
            .field("path", &self.path)
            .field("model", &type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Params for ModelReaderParams<T> {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Parameters for [`multi_line_model_reader`].
pub struct MultiLineModelReaderParams<T> {
    /// Line-delimited model file.
    pub path: PathBuf,
    /// Column moved to the front and marked as the table index.
    pub index: Option<String>,
    /// Renames applied to the serialized field names, before the index is set.
    pub column_names: HashMap<String, String>,
    model: PhantomData<fn() -> T>,
}

impl<T> MultiLineModelReaderParams<T> {
    /// Line-delimited model file at `path`, no index and no renames.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: None,
            column_names: HashMap::new(),
            model: PhantomData,
        }
    }

    /// Column to move first and mark as the index.
    pub fn with_index(mut self, index: &str) -> Self {
        self.index = Some(index.to_string());
        self
    }

    /// Renames serialized field `from` to `to`.
    pub fn rename(mut self, from: &str, to: &str) -> Self {
        self.column_names.insert(from.to_string(), to.to_string());
        self
    }
}

impl<T> fmt::Debug for MultiLineModelReaderParams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiLineModelReaderParams")
            .field("path", &self.path)
            .field("index", &self.index)
            .field("column_names", &self.column_names)
            .field("model", &type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Params for MultiLineModelReaderParams<T> {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Validates the whole file into one `T`.
pub fn read_model<T: DeserializeOwned>(params: &ModelReaderParams<T>) -> AppResult<T> {
    let text = fs::read_to_string(&params.path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Validates every non-blank line into a `T`.
pub fn read_model_lines<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<T>(line).map_err(ContractError::from))
        .collect()
}

/// Tabulates serialized records into a typed [`RecordBatch`].
///
/// Column types are inferred from every record; columns follow the field order of the
/// first record, with fields that only appear later appended after it.
pub fn tabulate<T: Serialize>(records: &[T]) -> AppResult<RecordBatch> {
    let values = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(Value::Object(map)),
            other => Err(ContractError::Source(format!(
                "Expected a record that serializes to an object, got {other}"
            ))),
        })
        .collect::<AppResult<Vec<_>>>()?;

    let inferred = infer_json_schema_from_iterator(values.iter().map(Ok))?;
    let mut order: Vec<&str> = values
        .first()
        .and_then(Value::as_object)
        .map(|first| first.keys().map(String::as_str).collect())
        .unwrap_or_default();
    for field in inferred.fields() {
        if !order.contains(&field.name().as_str()) {
            order.push(field.name().as_str());
        }
    }
    let fields = order
        .iter()
        .map(|name| Ok(inferred.field_with_name(name)?.clone()))
        .collect::<AppResult<Vec<Field>>>()?;
    let schema = Arc::new(Schema::new(fields));

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
        .with_batch_size(values.len().max(1))
        .build_decoder()?;
    decoder.serialize(&values)?;
    Ok(decoder
        .flush()?
        .unwrap_or_else(|| RecordBatch::new_empty(schema)))
}

/// Reader named `model` validating the whole file into `T`.
pub fn model_reader<T>() -> Reader<Payload>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Reader::new("model", |params: &ModelReaderParams<T>| {
        Ok(Payload::Model(ModelData::new(read_model(params)?)))
    })
}

/// Serializes a [`Payload::Model`] holding a `T` back to pretty JSON.
pub fn model_writer<T>() -> Writer<Payload>
where
    T: Serialize + Send + Sync + 'static,
{
    Writer::new("model", |data: &Payload, params: &ModelReaderParams<T>| {
        let model = data.as_model::<T>().ok_or_else(|| {
            ContractError::Source(format!(
                "Model writer expects {}, got {}",
                type_name::<T>(),
                data.type_name()
            ))
        })?;
        fs::write(&params.path, serde_json::to_string_pretty(model)?)?;
        Ok(())
    })
}

/// Reader named `multi_line_model` producing a [`Payload::Table`] of `T` records.
pub fn multi_line_model_reader<T>() -> Reader<Payload>
where
    T: DeserializeOwned + Serialize + 'static,
{
    Reader::new("multi_line_model", |params: &MultiLineModelReaderParams<T>| {
        let records = read_model_lines::<T>(&params.path)?;
        let mut batch = table::rename_columns(&tabulate(&records)?, &params.column_names)?;
        if let Some(index) = &params.index {
            batch = table::set_index(&batch, index)?;
        }
        Ok(Payload::Table(batch))
    })
}
