//! The closed set of node variants and the introspection trait they share.

use crate::error::{AppResult, ContractError};
use crate::stream::collection::DataStreamCollection;
use crate::stream::leaf::DataStream;
use crate::stream::params::Params;
use crate::stream::payload::Payload;

/// Read-only view over any node of a tree.
///
/// Used by the tree printer and summaries so they never need to know which variant
/// they are looking at.
pub trait StreamNode {
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn has_data(&self) -> bool;
    fn is_collection(&self) -> bool;
    fn reader_name(&self) -> Option<&str>;
    fn writer_name(&self) -> Option<&str>;
    fn reader_params(&self) -> Option<&dyn Params>;
    fn writer_params(&self) -> Option<&dyn Params>;

    /// Runtime label of the loaded data, `None` when nothing is loaded.
    fn data_type_name(&self) -> Option<&'static str>;
}

impl StreamNode for DataStream {
    fn name(&self) -> &str {
        DataStream::name(self)
    }

    fn description(&self) -> Option<&str> {
        DataStream::description(self)
    }

    fn has_data(&self) -> bool {
        DataStream::has_data(self)
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn reader_name(&self) -> Option<&str> {
        self.reader().map(|r| r.name())
    }

    fn writer_name(&self) -> Option<&str> {
        self.writer().map(|w| w.name())
    }

    fn reader_params(&self) -> Option<&dyn Params> {
        DataStream::reader_params(self)
    }

    fn writer_params(&self) -> Option<&dyn Params> {
        DataStream::writer_params(self)
    }

    fn data_type_name(&self) -> Option<&'static str> {
        self.data().ok().map(Payload::type_name)
    }
}

impl StreamNode for DataStreamCollection {
    fn name(&self) -> &str {
        DataStreamCollection::name(self)
    }

    fn description(&self) -> Option<&str> {
        DataStreamCollection::description(self)
    }

    fn has_data(&self) -> bool {
        DataStreamCollection::has_data(self)
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn reader_name(&self) -> Option<&str> {
        DataStreamCollection::reader_name(self)
    }

    fn writer_name(&self) -> Option<&str> {
        DataStreamCollection::writer_name(self)
    }

    fn reader_params(&self) -> Option<&dyn Params> {
        DataStreamCollection::reader_params(self)
    }

    fn writer_params(&self) -> Option<&dyn Params> {
        DataStreamCollection::writer_params(self)
    }

    fn data_type_name(&self) -> Option<&'static str> {
        self.has_data().then_some("Streams")
    }
}

/// A node of the tree: either a leaf stream or a collection of nodes.
#[derive(Debug)]
pub enum Node {
    /// A leaf.
    Stream(DataStream),
    /// A group of nodes.
    Collection(DataStreamCollection),
}

impl Node {
    fn view(&self) -> &dyn StreamNode {
        match self {
            Node::Stream(s) => s,
            Node::Collection(c) => c,
        }
    }

    /// Name of the wrapped stream or collection.
    pub fn name(&self) -> &str {
        self.view().name()
    }

    /// True once the node was loaded.
    pub fn has_data(&self) -> bool {
        self.view().has_data()
    }

    /// True for collections.
    pub fn is_collection(&self) -> bool {
        matches!(self, Node::Collection(_))
    }

    /// Loads this node only. Children of a collection are not touched; see
    /// [`crate::loader::load_branch`] for recursive loading.
    pub fn load(&mut self) -> AppResult<&mut Self> {
        match self {
            Node::Stream(s) => {
                s.load()?;
            }
            Node::Collection(c) => {
                c.load()?;
            }
        }
        Ok(self)
    }

    /// Loads only if the node holds no data yet.
    pub fn load_if_unloaded(&mut self) -> AppResult<&mut Self> {
        if !self.has_data() {
            self.load()?;
        }
        Ok(self)
    }

    /// The leaf, if this node is one.
    pub fn as_stream(&self) -> Option<&DataStream> {
        match self {
            Node::Stream(s) => Some(s),
            Node::Collection(_) => None,
        }
    }

    /// Mutable leaf, if this node is one.
    pub fn as_stream_mut(&mut self) -> Option<&mut DataStream> {
        match self {
            Node::Stream(s) => Some(s),
            Node::Collection(_) => None,
        }
    }

    /// The collection, if this node is one.
    pub fn as_collection(&self) -> Option<&DataStreamCollection> {
        match self {
            Node::Collection(c) => Some(c),
            Node::Stream(_) => None,
        }
    }

    /// Mutable collection, if this node is one.
    pub fn as_collection_mut(&mut self) -> Option<&mut DataStreamCollection> {
        match self {
            Node::Collection(c) => Some(c),
            Node::Stream(_) => None,
        }
    }

    /// Leaf payload. Collections hold nodes, not payloads, so asking one is a state error.
    pub fn data(&self) -> AppResult<&Payload> {
        match self {
            Node::Stream(s) => s.data(),
            Node::Collection(c) => Err(ContractError::State(format!(
                "'{}' is a collection; use at() to reach its streams.",
                c.name()
            ))),
        }
    }

    /// Child lookup. A leaf has no children, so any name is a lookup error.
    pub fn at(&self, name: &str) -> AppResult<&Node> {
        match self {
            Node::Collection(c) => c.at(name),
            Node::Stream(s) => Err(not_a_collection(s.name(), name)),
        }
    }

    /// Mutable variant of [`Node::at`].
    pub fn at_mut(&mut self, name: &str) -> AppResult<&mut Node> {
        match self {
            Node::Collection(c) => c.at_mut(name),
            Node::Stream(s) => Err(not_a_collection(s.name(), name)),
        }
    }

    /// Descendant by `/`-separated path.
    pub fn resolve(&self, path: &str) -> AppResult<&Node> {
        match self {
            Node::Collection(c) => c.resolve(path),
            Node::Stream(s) => Err(not_a_collection(s.name(), path)),
        }
    }

    /// Mutable variant of [`Node::resolve`].
    pub fn resolve_mut(&mut self, path: &str) -> AppResult<&mut Node> {
        match self {
            Node::Collection(c) => c.resolve_mut(path),
            Node::Stream(s) => Err(not_a_collection(s.name(), path)),
        }
    }
}

fn not_a_collection(owner: &str, name: &str) -> ContractError {
    ContractError::Lookup(format!(
        "'{owner}' is a data stream and has no child '{name}'."
    ))
}

impl StreamNode for Node {
    fn name(&self) -> &str {
        self.view().name()
    }

    fn description(&self) -> Option<&str> {
        self.view().description()
    }

    fn has_data(&self) -> bool {
        self.view().has_data()
    }

    fn is_collection(&self) -> bool {
        Node::is_collection(self)
    }

    fn reader_name(&self) -> Option<&str> {
        self.view().reader_name()
    }

    fn writer_name(&self) -> Option<&str> {
        self.view().writer_name()
    }

    fn reader_params(&self) -> Option<&dyn Params> {
        self.view().reader_params()
    }

    fn writer_params(&self) -> Option<&dyn Params> {
        self.view().writer_params()
    }

    fn data_type_name(&self) -> Option<&'static str> {
        self.view().data_type_name()
    }
}

impl From<DataStream> for Node {
    fn from(value: DataStream) -> Self {
        Node::Stream(value)
    }
}

impl From<DataStreamCollection> for Node {
    fn from(value: DataStreamCollection) -> Self {
        Node::Collection(value)
    }
}
