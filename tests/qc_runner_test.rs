//! Author-defined QC suites over a loaded dataset.

use arrow::array::AsArray;
use rust_datastreams::io::csv::{csv_reader, CsvReaderParams};
use rust_datastreams::qc::{Outcome, ResultsStatistics, Runner, RunnerOptions, Status, Suite};
use rust_datastreams::{BranchOptions, ContractError, DataStream, DataStreamCollection, Dataset, Node};
use serde_json::json;
use std::fs;

fn dataset(dir: &std::path::Path) -> Dataset {
    let trials = DataStream::builder("trials")
        .reader(csv_reader())
        .reader_params(CsvReaderParams::new(dir.join("trials.csv")))
        .build()
        .unwrap();
    let root = DataStreamCollection::new_static("session", [Node::Stream(trials)]).unwrap();
    Dataset::builder("behavior").data_streams(root).build().unwrap()
}

fn trial_suite(dataset: &Dataset) -> Suite<'_> {
    Suite::new("Trials")
        .test("has_trials", "At least one trial was recorded", move || {
            let table = dataset.resolve("trials")?.data()?;
            let table = table
                .as_table()
                .ok_or_else(|| ContractError::Source("trials is not a table".into()))?;
            Ok(if table.num_rows() == 0 {
                Outcome::fail("No trials recorded")
            } else {
                Outcome::pass("Trials recorded").with_result(table.num_rows())
            })
        })
        .test("outcomes_are_known", "Every outcome is hit or miss", move || {
            let data = dataset.resolve("trials")?.data()?;
            let Some(outcomes) = data
                .as_table()
                .and_then(|t| t.column_by_name("outcome"))
                .and_then(|c| c.as_string_opt::<i32>())
            else {
                return Ok(Outcome::skip("No outcome column"));
            };
            let unknown: Vec<&str> = outcomes
                .iter()
                .flatten()
                .filter(|o| !matches!(*o, "hit" | "miss"))
                .collect();
            Ok(if unknown.is_empty() {
                Outcome::pass("All outcomes known")
            } else {
                Outcome::warn("Unknown outcomes").with_context(json!({ "unknown": unknown }))
            })
        })
}

#[test]
fn test_suite_over_loaded_dataset() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trials.csv"), "trial,outcome\n1,hit\n2,abort\n").unwrap();
    let mut dataset = dataset(dir.path());
    dataset.load_all(BranchOptions::best_effort()).unwrap();

    let mut runner = Runner::new();
    runner.add_suite(trial_suite(&dataset));
    let results = runner.run_all();

    assert_eq!(results[0].status, Status::Passed);
    assert_eq!(results[0].result, Some(json!(2)));
    assert_eq!(results[1].status, Status::Warning);
    assert_eq!(results[1].context, Some(json!({"unknown": ["abort"]})));
}

#[test]
fn test_unloaded_data_becomes_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dataset(dir.path());

    let mut runner = Runner::new();
    runner.add_suite(trial_suite(&dataset));
    let results = runner.run_all();
    assert!(results.iter().all(|r| r.status == Status::Error));
    assert!(results[0].error.as_deref().unwrap().contains("not been loaded"));

    let stats = ResultsStatistics::from_results(&results);
    assert_eq!(stats.error, 2);
    assert_eq!(stats.pass_rate(), 0.0);
}

#[test]
fn test_elevated_warnings_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trials.csv"), "trial,outcome\n1,abort\n").unwrap();
    let mut dataset = dataset(dir.path());
    dataset.load_all(BranchOptions::strict()).unwrap();

    let mut runner = Runner::new().with_options(RunnerOptions {
        elevate_warnings: true,
        ..RunnerOptions::default()
    });
    runner.add_suite(trial_suite(&dataset));
    let results = runner.run_all();
    assert_eq!(results[1].status, Status::Failed);
    assert_eq!(results[1].suite_name, "Trials");
    assert_eq!(
        results[1].to_string(),
        "[failed] Trials::outcomes_are_known: Unknown outcomes"
    );
}
