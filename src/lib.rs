//! # Rust Datastreams Core Library
//!
//! Lazy, composable access to heterogeneous experiment recordings. A dataset is
//! declared as a tree: leaves ([`DataStream`]) bind a reader and its parameters to one
//! source, collections ([`DataStreamCollection`]) group leaves either statically or by
//! discovering them at load time. Nothing is read until a node is loaded, and a whole
//! branch can be loaded best-effort with every failure reported against its path.
//!
//! ## Crate Structure
//!
//! - **`stream`**: The tree itself. Leaf and collection nodes, the `Node` sum type, the
//!   `StreamNode` trait and the type-erased `Reader`/`Writer` plugin contract.
//! - **`loader`**: Recursive branch loading with per-node failure capture.
//! - **`tree`**: Human-readable tree rendering.
//! - **`dataset`**: A named, versioned root collection.
//! - **`io`**: Concrete CSV, JSON, text, typed-model readers and writers, plus the
//!   glob-based file multiplexer.
//! - **`harp`**: Harp binary register decoding and device schema resolution.
//! - **`table`**: Index and rename helpers for Arrow-backed tabular payloads.
//! - **`qc`**: Quality-control suites and the runner that executes them.
//! - **`config`**: `figment`-based settings. See `config::Settings`.
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`error`**: The crate-wide `ContractError` enum.
//! - **`validation`**: Small reusable predicates for names, paths and ranges.
//!
//! ## Example
//!
//! ```
//! use rust_datastreams::io::text::{text_reader, TextParams};
//! use rust_datastreams::{loader, DataStream, DataStreamCollection, Node};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let notes = DataStream::builder("notes")
//!     .reader(text_reader())
//!     .reader_params(TextParams::new("does/not/exist.txt"))
//!     .build()?;
//! let mut root = Node::from(DataStreamCollection::new_static("session", [Node::Stream(notes)])?);
//!
//! let failures = loader::load_branch(&mut root, false)?;
//! assert_eq!(failures.len(), 1);
//! assert_eq!(failures[0].path, "notes");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod harp;
pub mod io;
pub mod loader;
pub mod logging;
pub mod qc;
pub mod slot;
pub mod stream;
pub mod table;
pub mod tree;
pub mod validation;

pub use dataset::{Dataset, DatasetBuilder};
pub use error::{AppResult, ContractError};
pub use loader::{load_branch, load_branch_with, BranchOptions, LoadFailure};
pub use slot::Slot;
pub use stream::{
    CollectionKind, DataStream, DataStreamCollection, Node, Params, Payload, Reader,
    StreamNode, Streams, Writer,
};
pub use tree::TreeOptions;
