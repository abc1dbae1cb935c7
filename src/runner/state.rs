use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of a single generated test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
    Timeout,
}

impl TestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
            TestStatus::Skipped => "skipped",
            TestStatus::Timeout => "timeout",
        }
    }
}

/// Result from executing a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default = "Utc::now")]
    pub executed_at: DateTime<Utc>,
}

impl TestResult {
    pub fn new(test_name: &str, status: TestStatus) -> Self {
        Self {
            test_name: test_name.to_string(),
            status,
            duration_seconds: 0.0,
            stdout: String::new(),
            stderr: String::new(),
            error_message: None,
            executed_at: Utc::now(),
        }
    }
}

/// Result from executing a full test suite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub suite_name: String,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
    #[serde(default)]
    pub total_duration_seconds: f64,
    #[serde(default = "Utc::now")]
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn new(suite_name: &str, test_results: Vec<TestResult>) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            test_results,
            total_duration_seconds: 0.0,
            executed_at: Utc::now(),
        }
    }

    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    pub fn errors(&self) -> usize {
        self.count(TestStatus::Error)
    }

    pub fn pass_rate(&self) -> f64 {
        if self.test_results.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.test_results.len() as f64
    }

    fn count(&self, status: TestStatus) -> usize {
        self.test_results
            .iter()
            .filter(|t| t.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_rate() {
        let result = ExecutionResult::new(
            "suite",
            vec![
                TestResult::new("test_a", TestStatus::Passed),
                TestResult::new("test_b", TestStatus::Failed),
                TestResult::new("test_c", TestStatus::Passed),
                TestResult::new("test_d", TestStatus::Error),
            ],
        );
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.errors(), 1);
        assert!((result.pass_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_suite_pass_rate_is_zero() {
        let result = ExecutionResult::new("suite", Vec::new());
        assert_eq!(result.pass_rate(), 0.0);
    }
}
