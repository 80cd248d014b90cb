//! Top-level, versioned container for one stream tree.

use crate::error::{AppResult, ContractError};
use crate::loader::{self, BranchOptions, LoadFailure};
use crate::stream::{DataStream, DataStreamCollection, Node};
use crate::tree::{self, TreeOptions};
use crate::validation;

/// A named, versioned dataset holding exactly one root collection.
#[derive(Debug)]
pub struct Dataset {
    name: String,
    version: String,
    description: Option<String>,
    data_streams: DataStreamCollection,
}

impl Dataset {
    /// Starts a [`DatasetBuilder`] for `name`.
    pub fn builder(name: &str) -> DatasetBuilder {
        DatasetBuilder::new(name)
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dataset version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional free-form description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Root collection.
    pub fn data_streams(&self) -> &DataStreamCollection {
        &self.data_streams
    }

    /// Mutable root collection.
    pub fn data_streams_mut(&mut self) -> &mut DataStreamCollection {
        &mut self.data_streams
    }

    /// Immediate child of the root by name.
    pub fn at(&self, name: &str) -> AppResult<&Node> {
        self.data_streams().at(name)
    }

    /// Mutable variant of [`Dataset::at`].
    pub fn at_mut(&mut self, name: &str) -> AppResult<&mut Node> {
        self.data_streams_mut().at_mut(name)
    }

    /// Descendant by `/`-separated path from the root collection.
    pub fn resolve(&self, path: &str) -> AppResult<&Node> {
        self.data_streams().resolve(path)
    }

    /// Mutable variant of [`Dataset::resolve`].
    pub fn resolve_mut(&mut self, path: &str) -> AppResult<&mut Node> {
        self.data_streams_mut().resolve_mut(path)
    }

    /// Loads the whole tree. See [`crate::loader::load_collection_branch`].
    pub fn load_all(&mut self, options: BranchOptions) -> AppResult<Vec<LoadFailure>> {
        loader::load_collection_branch(&mut self.data_streams, options)
    }

    /// Every loaded leaf under the root, depth-first.
    pub fn walk_data_streams(&self) -> impl Iterator<Item = &DataStream> {
        self.data_streams().walk_data_streams()
    }

    /// Text rendering of the tree, headed by the dataset name and version.
    pub fn tree(&self, options: TreeOptions) -> String {
        format!(
            "{} (v{})\n{}",
            self.name,
            self.version,
            tree::render_collection(&self.data_streams, options)
        )
    }
}

/// A builder for constructing `Dataset` instances.
pub struct DatasetBuilder {
    name: String,
    version: String,
    description: Option<String>,
    data_streams: Option<DataStreamCollection>,
}

impl DatasetBuilder {
    /// Builder for a dataset named `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
            data_streams: None,
        }
    }

    /// Defaults to `0.0.0`.
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Sets the root collection.
    pub fn data_streams(mut self, root: DataStreamCollection) -> Self {
        self.data_streams = Some(root);
        self
    }

    /// Fails if the name or version is empty or no root collection was given.
    pub fn build(self) -> AppResult<Dataset> {
        validation::is_not_empty(&self.name)
            .map_err(|e| ContractError::Configuration(format!("Dataset name: {e}")))?;
        validation::is_not_empty(&self.version)
            .map_err(|e| ContractError::Configuration(format!("Dataset version: {e}")))?;
        let root = self.data_streams.ok_or_else(|| {
            ContractError::Configuration(format!(
                "Dataset '{}' has no root collection.",
                self.name
            ))
        })?;
        Ok(Dataset {
            name: self.name,
            version: self.version,
            description: self.description,
            data_streams: root,
        })
    }
}
