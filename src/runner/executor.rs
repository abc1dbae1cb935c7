//! Process-isolated pytest execution for generated suites.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use tokio::process::Command;

use super::output::parse_pytest_output;
use super::state::{ExecutionResult, TestResult, TestStatus};
use super::workspace::RunWorkspace;
use crate::generator::TestSuite;
use crate::utils::python::find_python;

/// Runs generated suites under pytest in a scratch directory.
pub struct TestExecutor {
    python_binary: Option<String>,
    timeout: Duration,
}

/// Outcome of one suite execution plus where the suite was written.
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    pub execution_result: ExecutionResult,
    pub test_file_path: String,
}

impl TestExecutor {
    pub fn new(python_binary: Option<String>, timeout_secs: u64) -> Self {
        Self {
            python_binary,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Write the suite to disk and run it. Infrastructure problems are
    /// folded into synthetic results rather than surfaced as errors.
    pub async fn run_suite(
        &self,
        suite: &TestSuite,
        base_url: &str,
        working_dir: Option<&Path>,
    ) -> Result<ExecutorOutput> {
        let workspace = RunWorkspace::prepare(suite, base_url, working_dir)?;
        let suite_name = workspace.suite_stem();

        let execution_result = match self.run_pytest(&workspace, base_url).await {
            Ok(results) => ExecutionResult::new(&suite_name, results),
            Err(err) => {
                warn!("Execution failed before pytest could report: {}", err);
                let mut result = TestResult::new("<suite>", TestStatus::Error);
                result.error_message = Some(err.to_string());
                ExecutionResult::new(&suite_name, vec![result])
            }
        };

        Ok(ExecutorOutput {
            execution_result,
            test_file_path: workspace.test_file.display().to_string(),
        })
    }

    async fn run_pytest(
        &self,
        workspace: &RunWorkspace,
        base_url: &str,
    ) -> Result<Vec<TestResult>> {
        let python = find_python(self.python_binary.as_deref())?;

        let mut cmd = Command::new(&python);
        cmd.arg("-m")
            .arg("pytest")
            .arg(&workspace.test_file)
            .arg("-v")
            .arg("--tb=short")
            .env("BASE_URL", base_url)
            .env("FORGE_RUN", "1")
            .current_dir(&workspace.dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // kill_on_drop reaps the hung pytest process
                let mut result = TestResult::new("<suite>", TestStatus::Timeout);
                result.error_message = Some(format!(
                    "Test execution timed out after {}s",
                    self.timeout.as_secs()
                ));
                return Ok(vec![result]);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        info!("pytest exit code: {:?}", output.status.code());

        Ok(parse_pytest_output(&stdout, &stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CandidateTest;

    fn suite() -> TestSuite {
        TestSuite {
            name: "unit".to_string(),
            tests: vec![CandidateTest {
                id: "1".to_string(),
                name: "test_a".to_string(),
                source_code: "def test_a():\n    assert True".to_string(),
                test_category: "api".to_string(),
                target_endpoint: None,
                target_method: None,
            }],
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_interpreter_yields_timeout_result() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-python");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let executor = TestExecutor::new(Some(script.display().to_string()), 1);
        let started = Instant::now();
        let output = executor
            .run_suite(&suite(), "http://localhost:5000", None)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let results = &output.execution_result.test_results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, TestStatus::Timeout);
        assert!(results[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("timed out after 1s"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_degrades_to_error_result() {
        let executor = TestExecutor::new(Some("/nonexistent/python".to_string()), 5);
        let output = executor
            .run_suite(&suite(), "http://localhost:5000", None)
            .await
            .unwrap();
        let results = &output.execution_result.test_results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "<suite>");
        assert_eq!(results[0].status, TestStatus::Error);
        assert!(results[0].error_message.is_some());
    }
}
