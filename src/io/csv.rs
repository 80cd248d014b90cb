//! CSV reader and writer over Arrow record batches.
//!
//! Column types are inferred from the whole file. Files without a header row get
//! columns named `0..n`, and the writer can leave its header out so that such a file
//! reads back unchanged.

use crate::error::{AppResult, ContractError};
use crate::stream::{Params, Payload, Reader, Writer};
use crate::table;
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parameters for [`csv_reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvReaderParams {
    /// File to read.
    pub path: PathBuf,
    /// Field delimiter; `None` means `,`.
    pub delimiter: Option<u8>,
    /// Treat the first row as the header. Without one, columns are named `0..n`.
    pub strict_header: bool,
}

impl CsvReaderParams {
    /// Comma-delimited, first row is the header.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: None,
            strict_header: true,
        }
    }

    /// Reads with `delimiter` instead of `,`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// The file has no header row.
    pub fn without_header(mut self) -> Self {
        self.strict_header = false;
        self
    }
}

impl Params for CsvReaderParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Parameters for [`csv_writer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriterParams {
    /// File to write.
    pub path: PathBuf,
    /// Field delimiter.
    pub delimiter: u8,
    /// Write the column names as the first row.
    pub header: bool,
    /// Keep the index column, if the table has one.
    pub index: bool,
}

impl CsvWriterParams {
    /// Comma-delimited, with a header row and no index column.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            header: true,
            index: false,
        }
    }

    /// Writes with `delimiter` instead of `,`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Leave the header row out.
    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    /// Keep the index column when writing.
    pub fn with_index(mut self) -> Self {
        self.index = true;
        self
    }
}

impl Params for CsvWriterParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Renames arrow's `column_1..` defaults to `0..n`.
fn numbered(schema: Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| f.as_ref().clone().with_name(i.to_string()))
        .collect();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}

/// Reads a whole CSV file into one typed [`RecordBatch`].
pub fn read_csv(params: &CsvReaderParams) -> AppResult<RecordBatch> {
    let delimiter = params.delimiter.unwrap_or(b',');
    let mut file = File::open(&params.path)?;

    let (schema, _) = Format::default()
        .with_header(params.strict_header)
        .with_delimiter(delimiter)
        .infer_schema(&mut file, None)?;
    file.rewind()?;
    let schema = Arc::new(if params.strict_header {
        schema
    } else {
        numbered(schema)
    });

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(params.strict_header)
        .with_delimiter(delimiter)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Writes `batch`, with or without its header row and index column.
pub fn write_csv(batch: &RecordBatch, params: &CsvWriterParams) -> AppResult<()> {
    let batch = if params.index {
        batch.clone()
    } else {
        table::without_index(batch)?
    };
    let file = File::create(&params.path)?;
    let mut writer = WriterBuilder::new()
        .with_header(params.header)
        .with_delimiter(params.delimiter)
        .build(file);
    writer.write(&batch)?;
    Ok(())
}

/// Reader named `csv` producing [`Payload::Table`].
pub fn csv_reader() -> Reader<Payload> {
    Reader::new("csv", |params: &CsvReaderParams| read_csv(params).map(Payload::Table))
}

/// Writer named `csv` accepting [`Payload::Table`].
pub fn csv_writer() -> Writer<Payload> {
    Writer::new("csv", |data: &Payload, params: &CsvWriterParams| {
        let batch = data.as_table().ok_or_else(|| {
            ContractError::Source(format!(
                "CSV writer expects a table, got {}",
                data.type_name()
            ))
        })?;
        write_csv(batch, params)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::{DataType, Float64Type, Int64Type};
    use std::fs;
    use std::io::Write;

    #[test]
    fn reads_header_and_typed_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "time,value,label\n0.1,3,a\n0.2,4,b\n").unwrap();

        let batch = read_csv(&CsvReaderParams::new(file.path())).unwrap();
        assert_eq!(table::column_names(&batch), ["time", "value", "label"]);
        assert_eq!(batch.num_rows(), 2);

        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(batch.column(0).as_primitive::<Float64Type>().value(1), 0.2);
        assert_eq!(batch.column(1).as_primitive::<Int64Type>().value(0), 3);
    }

    #[test]
    fn headerless_files_get_numbered_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1;2;3\n4;5;6\n").unwrap();

        let params = CsvReaderParams::new(file.path())
            .with_delimiter(b';')
            .without_header();
        let batch = read_csv(&params).unwrap();
        assert_eq!(table::column_names(&batch), ["0", "1", "2"]);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(2).as_primitive::<Int64Type>().value(1), 6);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv(&CsvReaderParams::new(dir.path().join("absent.csv"))).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn writer_rejects_non_tables() {
        let dir = tempfile::tempdir().unwrap();
        let writer = csv_writer();
        let params = CsvWriterParams::new(dir.path().join("out.csv"));
        let err = writer.write(&Payload::Text("x".into()), &params).unwrap_err();
        assert!(matches!(err, ContractError::Source(_)));
    }

    #[test]
    fn headerless_write_reads_back_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        fs::write(&path, "1,2\n3,4\n").unwrap();

        let reader = CsvReaderParams::new(&path).without_header();
        let before = read_csv(&reader).unwrap();
        write_csv(&before, &CsvWriterParams::new(&path).without_header()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1,2\n3,4\n");
        assert_eq!(read_csv(&reader).unwrap(), before);
    }

    #[test]
    fn index_column_is_dropped_unless_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.csv");
        fs::write(&path, "trial,outcome\n1,hit\n2,miss\n").unwrap();
        let batch = read_csv(&CsvReaderParams::new(&path)).unwrap();
        let indexed = table::set_index(&batch, "outcome").unwrap();

        let out = dir.path().join("out.csv");
        write_csv(&indexed, &CsvWriterParams::new(&out)).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "trial\n1\n2\n");

        write_csv(&indexed, &CsvWriterParams::new(&out).with_index()).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "outcome,trial\nhit,1\nmiss,2\n"
        );
    }
}
