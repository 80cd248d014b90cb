//! Quality-control checks over loaded stream trees.
//!
//! A [`Suite`] is an explicit list of named checks. Each check returns an [`Outcome`];
//! a check that returns `Err` is recorded as [`Status::Error`]. The [`Runner`] collects
//! every suite's [`QcResult`]s and [`ResultsStatistics`] summarizes them.

pub mod harp;
mod runner;
mod suite;

pub use harp::HarpDeviceSuite;
pub use runner::{ResultsStatistics, Runner, RunnerOptions};
pub use suite::{QcTest, Suite, TestFn};

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Final state of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The check passed.
    Passed,
    /// The check failed.
    Failed,
    /// The check itself could not run.
    Error,
    /// The check did not apply.
    Skipped,
    /// Passed, with something worth a look.
    Warning,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Error => "error",
            Status::Skipped => "skipped",
            Status::Warning => "warning",
        };
        f.write_str(label)
    }
}

/// What a check reports back to its suite.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Status reported for the check.
    pub status: Status,
    /// Value the check computed, if any.
    pub result: Option<Value>,
    /// Human-readable summary.
    pub message: Option<String>,
    /// Extra structured detail, e.g. the offending registers.
    pub context: Option<Value>,
}

impl Outcome {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            result: None,
            message: Some(message.into()),
            context: None,
        }
    }

    /// A passing outcome.
    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Status::Passed, message)
    }

    /// A failing outcome.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Status::Failed, message)
    }

    /// A skipped outcome.
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(Status::Skipped, message)
    }

    /// A passing outcome that deserves attention.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warning, message)
    }

    /// Value produced by the check, e.g. the WhoAmI that was read.
    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Structured detail explaining a failure.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Recorded result of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcResult {
    /// Final status, after any runner rewrites.
    pub status: Status,
    /// Value the check computed, if any.
    pub result: Option<Value>,
    /// Name of the check.
    pub test_name: String,
    /// Name of the suite the check belongs to.
    pub suite_name: String,
    /// Human-readable summary.
    pub message: Option<String>,
    /// Description registered with the check.
    pub description: Option<String>,
    /// Extra structured detail.
    pub context: Option<Value>,
    /// Error text when the check itself failed to run.
    pub error: Option<String>,
}

impl fmt::Display for QcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}::{}", self.status, self.suite_name, self.test_name)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(error) = &self.error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}
