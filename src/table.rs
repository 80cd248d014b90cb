//! Tabular payloads as Arrow record batches.
//!
//! CSV files and line-delimited model records are loaded into a single typed
//! [`RecordBatch`]. The index column, when one is set, is recorded in the schema
//! metadata under [`INDEX_METADATA_KEY`] and always sits first.

use crate::error::{AppResult, ContractError};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;

/// Schema metadata key naming the index column.
pub const INDEX_METADATA_KEY: &str = "index";

/// Column names in schema order.
pub fn column_names(batch: &RecordBatch) -> Vec<&str> {
    batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect()
}

/// Name of the index column, if one was set.
pub fn index_column(batch: &RecordBatch) -> Option<&str> {
    batch
        .schema_ref()
        .metadata()
        .get(INDEX_METADATA_KEY)
        .map(String::as_str)
}

/// Renames columns through `names` (old -> new). Unknown names are ignored.
pub fn rename_columns(
    batch: &RecordBatch,
    names: &HashMap<String, String>,
) -> AppResult<RecordBatch> {
    let schema = batch.schema_ref();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| match names.get(f.name()) {
            Some(to) => f.as_ref().clone().with_name(to),
            None => f.as_ref().clone(),
        })
        .collect();

    let mut metadata = schema.metadata().clone();
    if let Some(to) = metadata.get(INDEX_METADATA_KEY).and_then(|i| names.get(i)) {
        metadata.insert(INDEX_METADATA_KEY.to_string(), to.clone());
    }

    let schema = Schema::new_with_metadata(fields, metadata);
    Ok(RecordBatch::try_new(Arc::new(schema), batch.columns().to_vec())?)
}

/// Marks `name` as the index column and moves it to the front.
pub fn set_index(batch: &RecordBatch, name: &str) -> AppResult<RecordBatch> {
    let position = batch.schema_ref().index_of(name).map_err(|_| {
        ContractError::Source(format!("Index column '{name}' not found in table"))
    })?;
    let order: Vec<usize> = std::iter::once(position)
        .chain((0..batch.num_columns()).filter(|&i| i != position))
        .collect();
    let projected = batch.project(&order)?;

    let mut metadata = projected.schema_ref().metadata().clone();
    metadata.insert(INDEX_METADATA_KEY.to_string(), name.to_string());
    let schema = projected.schema_ref().as_ref().clone().with_metadata(metadata);
    Ok(RecordBatch::try_new(Arc::new(schema), projected.columns().to_vec())?)
}

/// Drops the index column, if any, along with its metadata entry.
pub fn without_index(batch: &RecordBatch) -> AppResult<RecordBatch> {
    let Some(index) = index_column(batch) else {
        return Ok(batch.clone());
    };
    let position = batch.schema_ref().index_of(index)?;
    let keep: Vec<usize> = (0..batch.num_columns()).filter(|&i| i != position).collect();
    let projected = batch.project(&keep)?;

    let mut metadata = projected.schema_ref().metadata().clone();
    metadata.remove(INDEX_METADATA_KEY);
    let schema = projected.schema_ref().as_ref().clone().with_metadata(metadata);
    Ok(RecordBatch::try_new(Arc::new(schema), projected.columns().to_vec())?)
}
