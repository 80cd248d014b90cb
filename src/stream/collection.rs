//! Composite nodes whose payload is a name-keyed set of child nodes.

use crate::error::{AppResult, ContractError};
use crate::stream::core::StreamCore;
use crate::stream::node::{Node, StreamNode};
use crate::stream::params::{Params, Reader, Writer};
use crate::stream::leaf::DataStream;
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Separator used by stream paths such as `Behavior/HarpBehavior/WhoAmI`.
pub const PATH_SEPARATOR: char = '/';

/// Children of a collection, keyed by name in declaration order.
#[derive(Debug, Default)]
pub struct Streams {
    inner: IndexMap<String, Node>,
}

impl Streams {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map, failing on the first repeated name.
    pub fn from_nodes<I>(nodes: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut streams = Self::new();
        for node in nodes {
            streams.insert(node)?;
        }
        Ok(streams)
    }

    /// Appends a child. Names must be unique among siblings.
    pub fn insert(&mut self, node: Node) -> AppResult<()> {
        let name = node.name().to_string();
        if self.inner.contains_key(&name) {
            return Err(ContractError::DuplicateName(name));
        }
        self.inner.insert(name, node);
        Ok(())
    }

    /// Removes a child, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        self.inner.shift_remove(name)
    }

    /// Child by name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.inner.get(name)
    }

    /// Mutable child by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.inner.get_mut(name)
    }

    /// True if a child is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if there are no children.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Child names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Children in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.values()
    }

    /// Mutable children in insertion order.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.inner.values_mut()
    }
}

/// How a collection obtains its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Children are produced by the collection's reader at load time.
    Dynamic,
    /// Children are supplied at construction; there is no reader.
    Static,
}

/// A composite node. Once loaded, its data is the [`Streams`] map of its children.
#[derive(Debug)]
pub struct DataStreamCollection {
    core: StreamCore<Vec<Node>, Streams>,
    kind: CollectionKind,
}

impl DataStreamCollection {
    /// A dynamic collection whose children come from `reader`. Bind its parameters
    /// with [`DataStreamCollection::with_reader_params`] before loading.
    pub fn new(name: impl Into<String>, reader: Reader<Vec<Node>>) -> AppResult<Self> {
        let mut core = StreamCore::new(name)?;
        core.reader.replace(reader);
        Ok(Self {
            core,
            kind: CollectionKind::Dynamic,
        })
    }

    /// A static collection holding `nodes` directly. Fails on duplicate names.
    pub fn new_static<I>(name: impl Into<String>, nodes: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut core = StreamCore::new(name)?;
        core.data.replace(Streams::from_nodes(nodes)?);
        Ok(Self {
            core,
            kind: CollectionKind::Static,
        })
    }

    /// Sets the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.core.description = Some(description.to_string());
        self
    }

    /// Binds the reader parameters; see [`DataStreamCollection::bind_reader_params`].
    pub fn with_reader_params<P: Params>(mut self, params: P) -> AppResult<Self> {
        self.core.bind_reader_params(Box::new(params))?;
        Ok(self)
    }

    /// Sets the writer used by [`DataStreamCollection::write`].
    pub fn with_writer(mut self, writer: Writer<Streams>) -> Self {
        self.core.writer.replace(writer);
        self
    }

    /// Binds the writer parameters.
    pub fn with_writer_params<P: Params>(mut self, params: P) -> AppResult<Self> {
        self.core.bind_writer_params(Box::new(params))?;
        Ok(self)
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        self.core.description.as_deref()
    }

    /// Whether children come from a reader or were given up front.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// True for collections built with [`DataStreamCollection::new_static`].
    pub fn is_static(&self) -> bool {
        self.kind == CollectionKind::Static
    }

    /// Bound reader parameters.
    pub fn reader_params(&self) -> Option<&dyn Params> {
        self.core.reader_params()
    }

    /// Bound writer parameters.
    pub fn writer_params(&self) -> Option<&dyn Params> {
        self.core.writer_params()
    }

    /// Binds reader parameters once; fails if no reader is set or they are already bound.
    pub fn bind_reader_params<P: Params>(&mut self, params: P) -> AppResult<&mut Self> {
        self.core.bind_reader_params(Box::new(params))?;
        Ok(self)
    }

    /// Binds writer parameters once; fails if no writer is set or they are already bound.
    pub fn bind_writer_params<P: Params>(&mut self, params: P) -> AppResult<&mut Self> {
        self.core.bind_writer_params(Box::new(params))?;
        Ok(self)
    }

    /// True once children are materialized.
    pub fn has_data(&self) -> bool {
        self.core.data.is_bound()
    }

    /// The children, or a `State` error if the collection is not loaded.
    pub fn streams(&self) -> AppResult<&Streams> {
        self.core.data()
    }

    pub(crate) fn streams_opt(&self) -> Option<&Streams> {
        self.core.data.get()
    }

    pub(crate) fn streams_opt_mut(&mut self) -> Option<&mut Streams> {
        self.core.data.get_mut()
    }

    /// Runs the reader and returns the discovered children without storing them.
    pub fn read(&self) -> AppResult<Vec<Node>> {
        if self.is_static() {
            return Err(ContractError::Configuration(format!(
                "Collection '{}' is static and has no reader.",
                self.core.name
            )));
        }
        self.core.read()
    }

    /// Materializes the children. Static collections are already materialized and
    /// this is a no-op for them; dynamic collections always re-read.
    pub fn load(&mut self) -> AppResult<&mut Self> {
        if self.is_static() {
            return Ok(self);
        }
        let streams = Streams::from_nodes(self.core.read()?)?;
        debug!(collection = %self.core.name, children = streams.len(), "loaded collection");
        self.core.data.replace(streams);
        Ok(self)
    }

    /// Loads only if the children were never materialized.
    pub fn load_if_unloaded(&mut self) -> AppResult<&mut Self> {
        if !self.has_data() {
            self.load()?;
        }
        Ok(self)
    }

    /// Writes `data`, or the loaded children when `None`.
    pub fn write(&self, data: Option<&Streams>) -> AppResult<()> {
        self.core.write(data)
    }

    fn loaded_streams(&self) -> AppResult<&Streams> {
        self.core.data.get().ok_or_else(|| {
            ContractError::Lookup(format!(
                "Collection '{}' has not been loaded. Cannot access its streams.",
                self.core.name
            ))
        })
    }

    fn loaded_streams_mut(&mut self) -> AppResult<&mut Streams> {
        let name = &self.core.name;
        self.core.data.get_mut().ok_or_else(|| {
            ContractError::Lookup(format!(
                "Collection '{name}' has not been loaded. Cannot access its streams."
            ))
        })
    }

    /// Direct child by name.
    pub fn at(&self, name: &str) -> AppResult<&Node> {
        self.loaded_streams()?.get(name).ok_or_else(|| {
            ContractError::Lookup(format!(
                "Stream '{name}' not found in '{}'.",
                self.core.name
            ))
        })
    }

    /// Mutable variant of [`DataStreamCollection::at`].
    pub fn at_mut(&mut self, name: &str) -> AppResult<&mut Node> {
        let owner = self.core.name.clone();
        self.loaded_streams_mut()?
            .get_mut(name)
            .ok_or_else(|| ContractError::Lookup(format!("Stream '{name}' not found in '{owner}'.")))
    }

    /// Descendant by `/`-separated path relative to this collection.
    pub fn resolve(&self, path: &str) -> AppResult<&Node> {
        let mut parts = path.split(PATH_SEPARATOR).filter(|p| !p.is_empty());
        let first = parts
            .next()
            .ok_or_else(|| ContractError::Lookup("Empty stream path.".to_string()))?;
        let mut node = self.at(first)?;
        for part in parts {
            node = node.at(part)?;
        }
        Ok(node)
    }

    /// Mutable variant of [`DataStreamCollection::resolve`].
    pub fn resolve_mut(&mut self, path: &str) -> AppResult<&mut Node> {
        let mut parts = path.split(PATH_SEPARATOR).filter(|p| !p.is_empty());
        let first = parts
            .next()
            .ok_or_else(|| ContractError::Lookup("Empty stream path.".to_string()))?;
        let mut node = self.at_mut(first)?;
        for part in parts {
            node = node.at_mut(part)?;
        }
        Ok(node)
    }

    /// Adds a child to a static collection.
    pub fn add_stream(&mut self, node: impl Into<Node>) -> AppResult<&mut Self> {
        self.require_static("add_stream")?;
        self.loaded_streams_mut()?.insert(node.into())?;
        Ok(self)
    }

    /// Removes a child from a static collection.
    pub fn remove_stream(&mut self, name: &str) -> AppResult<Node> {
        self.require_static("remove_stream")?;
        let owner = self.core.name.clone();
        self.loaded_streams_mut()?
            .remove(name)
            .ok_or_else(|| ContractError::Lookup(format!("Stream '{name}' not found in '{owner}'.")))
    }

    fn require_static(&self, operation: &str) -> AppResult<()> {
        if self.is_static() {
            Ok(())
        } else {
            Err(ContractError::Configuration(format!(
                "{operation} is only supported on static collections; '{}' is dynamic.",
                self.core.name
            )))
        }
    }

    /// Depth-first, pre-order walk over every leaf below this collection, paired with
    /// its path relative to this collection. Collections that are not loaded are
    /// skipped. Each call starts a fresh traversal.
    pub fn walk(&self) -> Walk<'_> {
        let mut stack = Vec::new();
        if let Some(streams) = self.core.data.get() {
            stack.push((String::new(), streams.inner.iter()));
        }
        Walk { stack }
    }

    /// Leaves only, in the order of [`DataStreamCollection::walk`].
    pub fn walk_data_streams(&self) -> impl Iterator<Item = &DataStream> {
        self.walk().map(|(_, stream)| stream)
    }

    pub(crate) fn reader_name(&self) -> Option<&str> {
        self.core.reader_name()
    }

    pub(crate) fn writer_name(&self) -> Option<&str> {
        self.core.writer_name()
    }
}

/// Iterator returned by [`DataStreamCollection::walk`].
pub struct Walk<'a> {
    stack: Vec<(String, indexmap::map::Iter<'a, String, Node>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a DataStream);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, children) = self.stack.last_mut()?;
            let Some((name, node)) = children.next() else {
                self.stack.pop();
                continue;
            };
            let path = join_path(prefix, name);
            match node {
                Node::Stream(stream) => return Some((path, stream)),
                Node::Collection(collection) => {
                    if let Some(streams) = collection.streams_opt() {
                        self.stack.push((path, streams.inner.iter()));
                    }
                }
            }
        }
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{name}")
    }
}

impl fmt::Display for DataStreamCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(streams) = self.core.data.get() else {
            return writeln!(f, "DataStreamCollection '{}' has not been loaded yet.", self.core.name);
        };

        let mut table: Vec<[String; 3]> = vec![
            ["Stream Name".into(), "Stream Type".into(), "Is Loaded".into()],
            ["-".repeat(20), "-".repeat(20), "-".repeat(20)],
        ];
        for (name, node) in &streams.inner {
            table.push([
                name.clone(),
                node.data_type_name().unwrap_or("Unknown").to_string(),
                if node.has_data() { "Yes" } else { "No" }.to_string(),
            ]);
        }

        let widths: [usize; 3] = std::array::from_fn(|col| {
            table
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        });
        for row in &table {
            let cells: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", cells.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
