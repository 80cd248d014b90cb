//! Concrete readers and writers for common file formats.
//!
//! Every reader here satisfies the same contract: a named function from a parameter
//! object (carrying at least a path) to a [`Payload`]. Nodes store them type-erased, so
//! a tree can mix formats freely.

pub mod csv;
pub mod json;
pub mod model;
pub mod mux;
pub mod text;

use crate::error::{AppResult, ContractError};
use crate::stream::{Params, Payload, Reader};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

type ReadPathFn = Box<dyn Fn(&Path) -> AppResult<Payload> + Send + Sync>;

/// Parameters that carry nothing but a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParams {
    /// File to read.
    pub path: PathBuf,
}

impl FileParams {
    /// Parameters pointing at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Params for FileParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Registry of per-extension read functions with default parameters.
///
/// New formats can be registered without touching the built-in ones.
///
/// ```
/// use rust_datastreams::io::ReaderRegistry;
///
/// let registry = ReaderRegistry::new();
/// assert!(registry.supports("csv"));
/// assert!(registry.list_extensions().contains(&"jsonl".to_string()));
/// ```
pub struct ReaderRegistry {
    readers: HashMap<String, ReadPathFn>,
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderRegistry {
    /// Creates a registry with csv, json, jsonl, txt and log registered.
    pub fn new() -> Self {
        let mut registry = Self {
            readers: HashMap::new(),
        };
        registry.register("csv", |path| {
            csv::read_csv(&csv::CsvReaderParams::new(path)).map(Payload::Table)
        });
        registry.register("json", |path| {
            json::read_json(&json::JsonReaderParams::new(path)).map(Payload::Json)
        });
        registry.register("jsonl", |path| {
            json::read_multi_line_json(&json::JsonReaderParams::new(path)).map(Payload::Json)
        });
        for ext in ["txt", "log"] {
            registry.register(ext, |path| Ok(Payload::Text(std::fs::read_to_string(path)?)));
        }
        registry
    }

    /// Registers (or replaces) the read function for an extension, matched case-insensitively.
    pub fn register<F>(&mut self, extension: &str, read: F)
    where
        F: Fn(&Path) -> AppResult<Payload> + Send + Sync + 'static,
    {
        self.readers
            .insert(extension.to_lowercase(), Box::new(read));
    }

    /// True if a reader is registered for `extension`.
    pub fn supports(&self, extension: &str) -> bool {
        self.readers.contains_key(&extension.to_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn list_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.readers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Reads `path` with the function registered for its extension.
    pub fn read(&self, path: &Path) -> AppResult<Payload> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let read = self.readers.get(&extension).ok_or_else(|| {
            ContractError::Configuration(format!(
                "No reader registered for extension '{extension}' ({}). Available: {}",
                path.display(),
                self.list_extensions().join(", ")
            ))
        })?;
        read(path)
    }
}

static DEFAULT_REGISTRY: Lazy<ReaderRegistry> = Lazy::new(ReaderRegistry::new);

/// Reader over [`FileParams`] that picks the format from the file extension.
pub fn extension_reader() -> Reader<Payload> {
    Reader::new("extension", |params: &FileParams| {
        DEFAULT_REGISTRY.read(&params.path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("data.CSV");
        let txt_path = dir.path().join("notes.txt");
        fs::write(&csv_path, "a,b\n1,2\n").unwrap();
        fs::write(&txt_path, "hello").unwrap();

        let reader = extension_reader();
        let table = reader.read(&FileParams::new(&csv_path)).unwrap();
        assert_eq!(table.type_name(), "Table");
        let text = reader.read(&FileParams::new(&txt_path)).unwrap();
        assert_eq!(text.as_text(), Some("hello"));
    }

    #[test]
    fn unknown_extension_is_a_configuration_error() {
        let registry = ReaderRegistry::new();
        let err = registry.read(Path::new("video.avi")).unwrap_err();
        assert!(matches!(err, ContractError::Configuration(_)));
    }

    #[test]
    fn custom_formats_can_be_registered() {
        let mut registry = ReaderRegistry::new();
        registry.register("bin", |_| Ok(Payload::Text("binary".into())));
        assert!(registry.supports("BIN"));
        assert_eq!(
            registry.read(Path::new("x.bin")).unwrap().as_text(),
            Some("binary")
        );
    }
}
