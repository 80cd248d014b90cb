//! Recursive branch loading with per-node failure capture.
//!
//! A branch is a node plus all of its descendants. [`load_branch`] loads the node
//! itself, then walks the branch depth-first in pre-order, loading every child. A
//! collection is loaded before its children are visited, since for dynamic
//! collections loading is what discovers the children in the first place.
//!
//! In best-effort mode a failing child is recorded as a [`LoadFailure`] and the walk
//! moves on to its next sibling; a collection that failed is not descended into. In
//! strict mode the first failure is returned as the error. The root's own load error
//! is always returned as the error, since nothing below it can be reached without it.

use crate::config::LoaderConfig;
use crate::error::{AppResult, ContractError};
use crate::stream::{join_path, DataStreamCollection, Node};
use std::fmt;
use tracing::{info, info_span, warn};

/// How a branch load reacts to failures and to nodes that already hold data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchOptions {
    /// Return the first failure instead of collecting them.
    pub strict: bool,
    /// Leave nodes that already hold data untouched.
    pub skip_loaded: bool,
}

impl BranchOptions {
    /// Collect failures and keep going.
    pub fn best_effort() -> Self {
        Self::default()
    }

    /// Stop at the first failure.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Leave nodes that already hold data untouched.
    pub fn skip_loaded(mut self, skip: bool) -> Self {
        self.skip_loaded = skip;
        self
    }
}

impl From<&LoaderConfig> for BranchOptions {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            strict: config.strict,
            skip_loaded: config.skip_loaded,
        }
    }
}

/// One child that failed to load during a best-effort branch load.
#[derive(Debug)]
pub struct LoadFailure {
    /// Path of the failed node relative to the branch root, e.g. `Behavior/WhoAmI`.
    pub path: String,
    /// What the node's reader returned.
    pub error: ContractError,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Loads `node` and all of its descendants.
///
/// Returns the captured failures; an empty list means every node loaded. With
/// `strict = true` the first failure is returned as the error instead.
pub fn load_branch(node: &mut Node, strict: bool) -> AppResult<Vec<LoadFailure>> {
    load_branch_with(
        node,
        BranchOptions {
            strict,
            ..BranchOptions::default()
        },
    )
}

/// Like [`load_branch`], with full control over the options.
pub fn load_branch_with(node: &mut Node, options: BranchOptions) -> AppResult<Vec<LoadFailure>> {
    match node {
        Node::Collection(collection) => load_collection_branch(collection, options),
        Node::Stream(_) => {
            let span = info_span!("load_branch", root = %node.name(), strict = options.strict);
            let _guard = span.enter();
            load_one(node, options)?;
            info!("branch loaded");
            Ok(Vec::new())
        }
    }
}

/// Branch load rooted at a collection that is not wrapped in a [`Node`], such as the
/// root of a [`crate::dataset::Dataset`].
pub fn load_collection_branch(
    collection: &mut DataStreamCollection,
    options: BranchOptions,
) -> AppResult<Vec<LoadFailure>> {
    let span = info_span!("load_branch", root = %collection.name(), strict = options.strict);
    let _guard = span.enter();

    if options.skip_loaded {
        collection.load_if_unloaded()?;
    } else {
        collection.load()?;
    }

    let mut failures = Vec::new();
    load_children(collection, "", options, &mut failures)?;

    if failures.is_empty() {
        info!("branch loaded");
    } else {
        info!(failures = failures.len(), "branch loaded with failures");
    }
    Ok(failures)
}

fn load_one(node: &mut Node, options: BranchOptions) -> AppResult<()> {
    if options.skip_loaded {
        node.load_if_unloaded()?;
    } else {
        node.load()?;
    }
    Ok(())
}

fn load_children(
    collection: &mut DataStreamCollection,
    prefix: &str,
    options: BranchOptions,
    failures: &mut Vec<LoadFailure>,
) -> AppResult<()> {
    let Some(streams) = collection.streams_opt_mut() else {
        return Ok(());
    };

    for child in streams.nodes_mut() {
        let path = join_path(prefix, child.name());
        if let Err(error) = load_one(child, options) {
            if options.strict {
                return Err(error);
            }
            warn!(path = %path, error = %error, "failed to load data stream");
            failures.push(LoadFailure { path, error });
            continue;
        }
        if let Node::Collection(inner) = child {
            load_children(inner, &path, options, failures)?;
        }
    }
    Ok(())
}
