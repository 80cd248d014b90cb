//! The lazy data-stream tree: leaves, collections and the reader/writer contract.

mod collection;
mod core;
mod leaf;
mod node;
mod params;
mod payload;

pub use collection::{CollectionKind, DataStreamCollection, Streams, Walk, PATH_SEPARATOR};
pub(crate) use collection::join_path;
pub use leaf::{DataStream, DataStreamBuilder};
pub use node::{Node, StreamNode};
pub use params::{AsAny, NullParams, Params, Reader, Writer};
pub use payload::{ModelData, Payload};
