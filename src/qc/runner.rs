//! Runs suites in order and summarizes their results.

use super::{QcResult, Status, Suite};
use std::fmt;
use tracing::{info, warn};

/// Status rewrites applied after every check has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Report skipped checks as failures.
    pub elevate_skips: bool,
    /// Report warnings as failures.
    pub elevate_warnings: bool,
}

/// Runs a set of suites.
#[derive(Default)]
pub struct Runner<'a> {
    suites: Vec<Suite<'a>>,
    options: RunnerOptions,
}

impl<'a> Runner<'a> {
    /// Runner with no suites and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status rewrites.
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Queues a suite; suites run in the order they were added.
    pub fn add_suite(&mut self, suite: Suite<'a>) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Current status rewrites.
    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    /// Runs every suite and applies the status rewrites.
    pub fn run_all(&self) -> Vec<QcResult> {
        let mut results = Vec::new();
        for suite in &self.suites {
            info!(suite = suite.name(), tests = suite.len(), "running qc suite");
            for mut result in suite.run() {
                result.status = self.elevate(result.status);
                if matches!(result.status, Status::Failed | Status::Error) {
                    warn!(
                        suite = %result.suite_name,
                        test = %result.test_name,
                        status = %result.status,
                        detail = result.message.as_deref().unwrap_or(""),
                        "qc test did not pass"
                    );
                }
                results.push(result);
            }
        }
        info!(summary = %ResultsStatistics::from_results(&results), "qc run finished");
        results
    }

    fn elevate(&self, status: Status) -> Status {
        match status {
            Status::Skipped if self.options.elevate_skips => Status::Failed,
            Status::Warning if self.options.elevate_warnings => Status::Failed,
            other => other,
        }
    }
}

/// Counts per status over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultsStatistics {
    /// Checks that passed.
    pub passed: usize,
    /// Checks that failed.
    pub failed: usize,
    /// Checks that returned an error.
    pub error: usize,
    /// Checks that were skipped.
    pub skipped: usize,
    /// Checks that passed with a warning.
    pub warnings: usize,
}

impl ResultsStatistics {
    /// Counts `results` by status.
    pub fn from_results(results: &[QcResult]) -> Self {
        results.iter().fold(Self::default(), |mut stats, r| {
            match r.status {
                Status::Passed => stats.passed += 1,
                Status::Failed => stats.failed += 1,
                Status::Error => stats.error += 1,
                Status::Skipped => stats.skipped += 1,
                Status::Warning => stats.warnings += 1,
            }
            stats
        })
    }

    /// Number of results counted.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.error + self.skipped + self.warnings
    }

    /// Fraction of checks that passed; 0 for an empty run.
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passed as f64 / total as f64,
        }
    }
}

impl fmt::Display for ResultsStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} error, {} skipped, {} warnings ({:.1}% of {})",
            self.passed,
            self.failed,
            self.error,
            self.skipped,
            self.warnings,
            self.pass_rate() * 100.0,
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qc::Outcome;
    use tracing_test::traced_test;

    fn mixed_suite() -> Suite<'static> {
        Suite::new("Mixed")
            .test("ok", "passes", || Ok(Outcome::pass("fine")))
            .test("later", "skips", || Ok(Outcome::skip("no commands")))
            .test("meh", "warns", || Ok(Outcome::warn("borderline")))
    }

    #[test]
    fn statistics_count_each_status() {
        let mut runner = Runner::new();
        runner.add_suite(mixed_suite());
        let stats = ResultsStatistics::from_results(&runner.run_all());
        assert_eq!((stats.passed, stats.skipped, stats.warnings), (1, 1, 1));
        assert_eq!(stats.total(), 3);
        assert_eq!(
            stats.to_string(),
            "1 passed, 0 failed, 0 error, 1 skipped, 1 warnings (33.3% of 3)"
        );
    }

    #[test]
    #[traced_test]
    fn elevated_statuses_become_failures() {
        let mut runner = Runner::new().with_options(RunnerOptions {
            elevate_skips: true,
            elevate_warnings: true,
        });
        runner.add_suite(mixed_suite());
        let results = runner.run_all();
        let statuses: Vec<Status> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, [Status::Passed, Status::Failed, Status::Failed]);
        assert!(logs_contain("qc test did not pass"));
    }

    #[test]
    fn empty_run_has_zero_pass_rate() {
        assert_eq!(ResultsStatistics::from_results(&[]).pass_rate(), 0.0);
    }
}
