//! Flakiness detection via repeated execution.

use std::collections::BTreeMap;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use super::executor::TestExecutor;
use super::state::TestStatus;
use crate::generator::TestSuite;

/// Run the suite `runs` times sequentially and report tests whose
/// status differs across runs. Fewer than two runs cannot show
/// inconsistency, so nothing is executed.
pub async fn detect_flaky_tests(
    executor: &TestExecutor,
    suite: &TestSuite,
    base_url: &str,
    runs: u32,
) -> Result<Vec<String>> {
    if runs < 2 {
        return Ok(Vec::new());
    }

    let bar = ProgressBar::new(runs as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] run {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut statuses_per_test: BTreeMap<String, Vec<TestStatus>> = BTreeMap::new();

    for i in 0..runs {
        info!("Flakiness detection run {}/{}", i + 1, runs);
        let output = executor.run_suite(suite, base_url, None).await?;
        for result in &output.execution_result.test_results {
            statuses_per_test
                .entry(result.test_name.clone())
                .or_default()
                .push(result.status);
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let flaky = flaky_from_histories(&statuses_per_test);
    for name in &flaky {
        warn!(
            "Flaky test detected: {}, statuses: {:?}",
            name, statuses_per_test[name]
        );
    }
    Ok(flaky)
}

/// A test is flaky when its status history holds more than one
/// distinct status.
pub fn flaky_from_histories(histories: &BTreeMap<String, Vec<TestStatus>>) -> Vec<String> {
    let mut flaky = Vec::new();
    for (name, statuses) in histories {
        let mut distinct: Vec<TestStatus> = statuses.clone();
        distinct.sort_by_key(|s| s.label());
        distinct.dedup();
        if distinct.len() > 1 {
            flaky.push(name.clone());
        }
    }
    flaky
}
