//! Directory multiplexer: one leaf stream per file matched by a set of globs.

use crate::error::{AppResult, ContractError};
use crate::stream::{DataStream, DataStreamCollection, Node, Params, Payload, Reader};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

type ParamsFactory = Arc<dyn Fn(&Path) -> Box<dyn Params> + Send + Sync>;

/// Parameters for [`file_mux_reader`].
///
/// Include patterns are relative to `path`. A match is dropped when its path relative
/// to `path`, or its file name, matches any exclude pattern.
#[derive(Clone)]
pub struct FileMuxParams {
    /// Directory to search.
    pub path: PathBuf,
    /// Patterns selecting files, relative to `path`.
    pub include_glob_pattern: Vec<String>,
    /// Patterns removing files from the selection.
    pub exclude_glob_pattern: Vec<String>,
    /// Descriptions for the generated streams, keyed by file stem.
    pub inner_descriptions: HashMap<String, String>,
    /// Reader bound to every discovered file.
    pub inner_reader: Reader<Payload>,
    inner_params_factory: ParamsFactory,
}

impl FileMuxParams {
    /// `factory` builds the reader parameters for one matched file.
    pub fn new<P, F>(path: impl Into<PathBuf>, inner_reader: Reader<Payload>, factory: F) -> Self
    where
        P: Params,
        F: Fn(&Path) -> P + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            include_glob_pattern: Vec::new(),
            exclude_glob_pattern: Vec::new(),
            inner_descriptions: HashMap::new(),
            inner_reader,
            inner_params_factory: Arc::new(move |p: &Path| Box::new(factory(p)) as Box<dyn Params>),
        }
    }

    /// Adds an include pattern, relative to the muxed directory.
    pub fn include(mut self, pattern: &str) -> Self {
        self.include_glob_pattern.push(pattern.to_string());
        self
    }

    /// Adds an exclude pattern, matched against the relative path and the file name.
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclude_glob_pattern.push(pattern.to_string());
        self
    }

    /// Description attached to the leaf for file stem `stem`.
    pub fn describe(mut self, stem: &str, description: &str) -> Self {
        self.inner_descriptions
            .insert(stem.to_string(), description.to_string());
        self
    }

    /// Files matched by the include patterns and not excluded, sorted by path.
    pub fn matched_files(&self) -> AppResult<Vec<PathBuf>> {
        let root = self.path.to_str().ok_or_else(|| {
            ContractError::Configuration(format!(
                "Mux root '{}' is not valid UTF-8",
                self.path.display()
            ))
        })?;
        let root = Pattern::escape(root);

        let excludes = self
            .exclude_glob_pattern
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };

        let mut hits = BTreeSet::new();
        for pattern in &self.include_glob_pattern {
            let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
            for entry in glob::glob_with(&full, options)? {
                let path = entry.map_err(glob::GlobError::into_error)?;
                if path.is_file() {
                    hits.insert(path);
                }
            }
        }

        hits.retain(|path| {
            let relative = path.strip_prefix(&self.path).unwrap_or(path);
            let name = path.file_name().map(Path::new);
            !excludes.iter().any(|ex| {
                ex.matches_path_with(relative, options)
                    || name.is_some_and(|n| ex.matches_path_with(n, options))
            })
        });
        debug!(root = %self.path.display(), hits = hits.len(), "file mux matched files");
        Ok(hits.into_iter().collect())
    }
}

impl fmt::Debug for FileMuxParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMuxParams")
            .field("path", &self.path)
            .field("include_glob_pattern", &self.include_glob_pattern)
            .field("exclude_glob_pattern", &self.exclude_glob_pattern)
            .field("inner_reader", &self.inner_reader.name())
            .finish()
    }
}

impl Params for FileMuxParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn stem_of(path: &Path) -> AppResult<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContractError::Source(format!("No usable file stem for '{}'", path.display())))
}

/// Reader for a dynamic collection producing one leaf per matched file, named by stem.
pub fn file_mux_reader() -> Reader<Vec<Node>> {
    Reader::new("file_mux", |params: &FileMuxParams| {
        let files = params.matched_files()?;
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(files.len());
        for file in &files {
            let stem = stem_of(file)?;
            if !seen.insert(stem.to_string()) {
                return Err(ContractError::DuplicateName(stem.to_string()));
            }
            let mut builder = DataStream::builder(stem).reader(params.inner_reader.clone());
            if let Some(description) = params.inner_descriptions.get(stem) {
                builder = builder.description(description);
            }
            let mut stream = builder.build()?;
            stream.bind_reader_params_boxed((params.inner_params_factory)(file))?;
            nodes.push(Node::Stream(stream));
        }
        Ok(nodes)
    })
}

/// A dynamic collection over `params`. Nothing touches the filesystem until it is loaded.
pub fn file_mux(name: &str, params: FileMuxParams) -> AppResult<DataStreamCollection> {
    DataStreamCollection::new(name, file_mux_reader())?.with_reader_params(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::text::{text_reader, TextParams};
    use std::fs;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn matches_are_sorted_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.txt");
        touch(dir.path(), "a.txt");
        touch(dir.path(), "skip_me.txt");
        touch(dir.path(), "notes.md");

        let params = FileMuxParams::new(dir.path(), text_reader(), |p: &Path| TextParams::new(p))
            .include("*.txt")
            .exclude("skip_*");
        let names: Vec<String> = params
            .matched_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn duplicate_stems_fail() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "camera.csv");
        touch(dir.path(), "camera.txt");

        let params = FileMuxParams::new(dir.path(), text_reader(), |p: &Path| TextParams::new(p)).include("camera.*");
        let mut mux = file_mux("Camera", params).unwrap();
        assert!(matches!(mux.load(), Err(ContractError::DuplicateName(ref n)) if n == "camera"));
    }

    #[test]
    fn overlapping_includes_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "log.txt");
        let params = FileMuxParams::new(dir.path(), text_reader(), |p: &Path| TextParams::new(p))
            .include("*.txt")
            .include("log.*")
            .describe("log", "session log");
        let mut mux = file_mux("Logs", params).unwrap();
        mux.load().unwrap();
        let log = mux.at("log").unwrap();
        assert_eq!(log.as_stream().unwrap().description(), Some("session log"));
        assert_eq!(mux.streams().unwrap().len(), 1);
    }

    #[test]
    fn bad_pattern_is_a_glob_error() {
        let dir = tempfile::tempdir().unwrap();
        let params = FileMuxParams::new(dir.path(), text_reader(), |p: &Path| TextParams::new(p)).exclude("[");
        assert!(matches!(params.matched_files(), Err(ContractError::Glob(_))));
    }
}
