//! Custom error types for the library.
//!
//! This module defines the primary error type, `ContractError`, shared by every node,
//! reader and writer in the crate. Using the `thiserror` crate, it keeps declaration
//! mistakes, state mistakes and data-source failures apart so callers can decide which
//! ones to surface and which ones to tolerate.
//!
//! ## Error Hierarchy
//!
//! - **`Configuration`**: A reader, writer or parameter object is missing (or mismatched)
//!   when an operation needs it. This is a declaration mistake and is never swallowed.
//! - **`State`**: Data was requested from a node that has not been loaded.
//! - **`DuplicateName`** / **`Lookup`**: Key-kind errors raised while building or
//!   navigating a collection.
//! - **Source errors** (`Io`, `Arrow`, `Json`, `Yaml`, `Glob`, `Http`, `Harp`, `Source`):
//!   whatever the underlying reader hit. They are kept as concrete variants, not
//!   flattened into strings, so a caller can branch on `ErrorKind::NotFound` and friends.
//! - **`Settings`**: Wraps errors from `figment` while loading the crate configuration.
//! - **`FeatureNotEnabled`**: Code attempted to use functionality that was not included
//!   at compile time via feature flags.
//!
//! By using `#[from]`, `ContractError` can be created from the underlying error types,
//! so readers propagate with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, ContractError>;

/// Primary error type for stream trees, readers and writers.
#[derive(Error, Debug)]
pub enum ContractError {
    /// A reader, writer or parameter slot is unset (or bound twice).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A node was asked for data it does not have yet.
    #[error("State error: {0}")]
    State(String),

    /// Two siblings share the same name.
    #[error("Duplicate stream name: '{0}'")]
    DuplicateName(String),

    /// Navigation to a missing child, or into a collection that is not loaded.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Filesystem failure, with its `ErrorKind` intact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or table construction failed.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Malformed JSON or a record that does not fit its model.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A multiplexer pattern that does not parse.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Remote schema request failed.
    #[cfg(feature = "harp_remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A harp register file could not be decoded.
    #[error("Harp decode error: {0}")]
    Harp(String),

    /// Free-form failure raised by a user-supplied reader or writer.
    #[error("Source error: {0}")]
    Source(String),

    /// Settings could not be loaded.
    #[error("Settings error: {0}")]
    Settings(#[from] figment::Error),

    /// Functionality compiled out by a feature flag.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl ContractError {
    /// True for the key-kind errors (`DuplicateName`, `Lookup`).
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::DuplicateName(_) | Self::Lookup(_))
    }

    /// True for errors that originate in a reader or writer rather than in the tree.
    pub fn is_source_error(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::Arrow(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Glob(_)
            | Self::Harp(_)
            | Self::Source(_) => true,
            #[cfg(feature = "harp_remote")]
            Self::Http(_) => true,
            _ => false,
        }
    }

    /// Returns the wrapped `std::io::ErrorKind` when the failure was plain I/O.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io(err) => Some(err.kind()),
            _ => None,
        }
    }
}
