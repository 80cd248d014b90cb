//! Explicit registration of quality-control checks.
//!
//! A suite author lists each check as a name, an optional description and a closure
//! borrowing the data it inspects. Running a suite never stops early; every check
//! yields exactly one [`QcResult`].

use super::{Outcome, QcResult, Status};
use crate::error::AppResult;
use tracing::debug;

/// A check borrowed over the data it inspects.
pub type TestFn<'a> = Box<dyn Fn() -> AppResult<Outcome> + 'a>;

/// One registered check.
pub struct QcTest<'a> {
    /// Check name.
    pub name: String,
    /// What the check verifies.
    pub description: Option<String>,
    func: TestFn<'a>,
}

impl<'a> QcTest<'a> {
    /// Wraps `func` as a named check.
    pub fn new<F>(name: &str, description: Option<&str>, func: F) -> Self
    where
        F: Fn() -> AppResult<Outcome> + 'a,
    {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            func: Box::new(func),
        }
    }

    /// Runs the check. An `Err` becomes [`Status::Error`] with its text kept.
    pub fn run(&self, suite_name: &str) -> QcResult {
        debug!(suite = suite_name, test = %self.name, "running qc test");
        match (self.func)() {
            Ok(outcome) => QcResult {
                status: outcome.status,
                result: outcome.result,
                test_name: self.name.clone(),
                suite_name: suite_name.to_string(),
                message: outcome.message,
                description: self.description.clone(),
                context: outcome.context,
                error: None,
            },
            Err(err) => QcResult {
                status: Status::Error,
                result: None,
                test_name: self.name.clone(),
                suite_name: suite_name.to_string(),
                message: Some("Error during test execution".to_string()),
                description: self.description.clone(),
                context: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Ordered list of checks registered by the suite author.
pub struct Suite<'a> {
    name: String,
    tests: Vec<QcTest<'a>>,
}

impl<'a> Suite<'a> {
    /// Empty suite named `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    /// Suite name, reported with every result.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a check, builder style.
    pub fn test<F>(mut self, name: &str, description: &str, func: F) -> Self
    where
        F: Fn() -> AppResult<Outcome> + 'a,
    {
        self.add_test(QcTest::new(name, Some(description), func));
        self
    }

    /// Registers a prepared [`QcTest`].
    pub fn add_test(&mut self, test: QcTest<'a>) -> &mut Self {
        self.tests.push(test);
        self
    }

    /// Registered test names, in registration order.
    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|t| t.name.as_str())
    }

    /// Number of registered tests.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// True if no test was registered.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Runs every check in registration order.
    pub fn run(&self) -> Vec<QcResult> {
        self.tests.iter().map(|t| t.run(&self.name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;

    #[test]
    fn checks_run_in_registration_order() {
        let threshold = 5;
        let suite = Suite::new("Numbers")
            .test("small", "below threshold", || {
                Ok(if 3 < threshold {
                    Outcome::pass("ok")
                } else {
                    Outcome::fail("too big")
                })
            })
            .test("broken", "raises", || {
                Err(ContractError::Source("sensor offline".into()))
            });

        assert_eq!(suite.test_names().collect::<Vec<_>>(), ["small", "broken"]);
        let results = suite.run();
        assert_eq!(results[0].status, Status::Passed);
        assert_eq!(results[0].description.as_deref(), Some("below threshold"));
        assert_eq!(results[1].status, Status::Error);
        assert_eq!(results[1].suite_name, "Numbers");
        assert!(results[1].error.as_deref().unwrap().contains("sensor offline"));
    }
}
