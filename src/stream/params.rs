//! Parameter objects and the reader/writer plugin contract.
//!
//! A reader is a named function `params -> data`; a writer is a named function
//! `(data, params) -> ()`. Both are stored type-erased on a node so that a tree can mix
//! CSV, JSON, text and harp streams. The concrete parameter type is recovered by
//! downcasting when the function runs; handing a reader the wrong parameter type is a
//! configuration error, not a panic.

use crate::error::{AppResult, ContractError};
use crate::validation;
use std::any::{type_name, Any};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Upcast helper so `&dyn Params` can be downcast to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Validated configuration handed to a reader or writer.
///
/// The only field the tree cares about structurally is the optional filesystem path;
/// everything else is opaque and only shown through `Debug` by the tree printer.
pub trait Params: AsAny + fmt::Debug + Send + Sync + 'static {
    /// Filesystem location the parameters point at, if any.
    fn path(&self) -> Option<&Path> {
        None
    }
}

impl dyn Params {
    /// Downcasts to a concrete parameter type.
    pub fn downcast_ref<P: Params>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }
}

/// Parameters for readers and writers that need none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullParams;

impl Params for NullParams {}

type ReadFn<T> = dyn Fn(&dyn Params) -> AppResult<T> + Send + Sync;
type WriteFn<T> = dyn Fn(&T, &dyn Params) -> AppResult<()> + Send + Sync;

fn mismatch<P>(role: &str, name: &str, got: &dyn Params) -> ContractError {
    ContractError::Configuration(format!(
        "{role} '{name}' expects parameters of type {} but was given {got:?}",
        type_name::<P>()
    ))
}

/// Rejects parameters whose path is empty or otherwise unusable.
fn check_path(role: &str, name: &str, params: &dyn Params) -> AppResult<()> {
    match params.path() {
        Some(path) => validation::is_valid_path(path).map_err(|reason| {
            ContractError::Configuration(format!(
                "{role} '{name}' was given an unusable path {path:?}: {reason}"
            ))
        }),
        None => Ok(()),
    }
}

/// A named, cloneable reader producing `T`.
pub struct Reader<T> {
    name: String,
    func: Arc<ReadFn<T>>,
}

impl<T: 'static> Reader<T> {
    /// Wraps a typed reader function.
    pub fn new<P, F>(name: impl Into<String>, func: F) -> Self
    where
        P: Params,
        F: Fn(&P) -> AppResult<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            func: Arc::new(move |params: &dyn Params| {
                let typed = params
                    .downcast_ref::<P>()
                    .ok_or_else(|| mismatch::<P>("Reader", &label, params))?;
                func(typed)
            }),
        }
    }

    /// Name shown by summaries and the tree printer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the reader. Errors from the underlying source pass through untouched.
    pub fn read(&self, params: &dyn Params) -> AppResult<T> {
        check_path("Reader", &self.name, params)?;
        (self.func)(params)
    }
}

impl<T> Clone for Reader<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reader({})", self.name)
    }
}

/// A named, cloneable writer consuming `T`.
pub struct Writer<T> {
    name: String,
    func: Arc<WriteFn<T>>,
}

impl<T: 'static> Writer<T> {
    /// Wraps a typed writer function.
    pub fn new<P, F>(name: impl Into<String>, func: F) -> Self
    where
        P: Params,
        F: Fn(&T, &P) -> AppResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            func: Arc::new(move |data: &T, params: &dyn Params| {
                let typed = params
                    .downcast_ref::<P>()
                    .ok_or_else(|| mismatch::<P>("Writer", &label, params))?;
                func(data, typed)
            }),
        }
    }

    /// Name shown by summaries and the tree printer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the writer with `data`.
    pub fn write(&self, data: &T, params: &dyn Params) -> AppResult<()> {
        check_path("Writer", &self.name, params)?;
        (self.func)(data, params)
    }
}

impl<T> Clone for Writer<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Writer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Writer({})", self.name)
    }
}
