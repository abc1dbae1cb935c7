//! Static quality scoring for generated tests.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::generator::{CandidateTest, TestSuite};
use crate::runner::ExecutionResult;

/// Quality assessment for a single generated test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    pub test_name: String,
    #[serde(default)]
    pub assertion_count: usize,
    #[serde(default)]
    pub assertion_quality: f64,
    #[serde(default)]
    pub coverage_breadth: f64,
    #[serde(default)]
    pub readability: f64,
    #[serde(default)]
    pub overall_score: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Aggregated validation result for a test suite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub suite_name: String,
    #[serde(default)]
    pub execution_result: Option<ExecutionResult>,
    #[serde(default)]
    pub quality_scores: Vec<QualityScore>,
    #[serde(default)]
    pub flaky_tests: Vec<String>,
    #[serde(default)]
    pub avg_quality_score: f64,
    #[serde(default)]
    pub summary: String,
}

/// Score every test in the suite and aggregate into a validation result.
pub fn validate_suite(
    suite: &TestSuite,
    execution_result: Option<ExecutionResult>,
    flaky_tests: Vec<String>,
) -> ValidationResult {
    let quality_scores: Vec<QualityScore> = suite.tests.iter().map(score_test).collect();

    let avg_quality_score = if quality_scores.is_empty() {
        0.0
    } else {
        quality_scores.iter().map(|q| q.overall_score).sum::<f64>() / quality_scores.len() as f64
    };

    let mut summary_parts = vec![
        format!("Tests: {}", suite.tests.len()),
        format!("Avg quality: {:.2}", avg_quality_score),
    ];
    if let Some(er) = &execution_result {
        summary_parts.push(format!("Passed: {}/{}", er.passed(), er.test_results.len()));
        summary_parts.push(format!("Pass rate: {:.0}%", er.pass_rate() * 100.0));
    }

    ValidationResult {
        suite_name: suite.name.clone(),
        execution_result,
        quality_scores,
        flaky_tests,
        avg_quality_score,
        summary: summary_parts.join(" | "),
    }
}

/// Score one test on assertions, coverage breadth, and readability.
pub fn score_test(test: &CandidateTest) -> QualityScore {
    let code = &test.source_code;
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let assert_re = Regex::new(r"\bassert\b").expect("valid regex");
    let assertion_count = assert_re.find_iter(code).count();
    let mut assertion_quality = match assertion_count {
        0 => {
            issues.push("No assertions found".to_string());
            0.0
        }
        1 => {
            suggestions.push("Consider adding more assertions".to_string());
            0.5
        }
        n => (n as f64 / 4.0).min(1.0),
    };

    let is_api = test.test_category == "api";
    let has_status_check = code.contains("status_code");
    if !has_status_check && is_api {
        issues.push("Missing status code assertion".to_string());
        assertion_quality *= 0.7;
    }

    let body_re = Regex::new(r"\.json\(\)|response\.data|response\.text|response\.content")
        .expect("valid regex");
    let has_body_check = body_re.is_match(code);
    if !has_body_check && is_api {
        suggestions.push("Consider asserting response body content".to_string());
    }

    let error_re = Regex::new(r"pytest\.raises|Exception|Error").expect("valid regex");
    let breadth_signals = [
        has_status_check,
        has_body_check,
        code.contains("headers"),
        error_re.is_match(code),
    ];
    let coverage_breadth =
        breadth_signals.iter().filter(|s| **s).count() as f64 / breadth_signals.len() as f64;

    let line_count = code.trim().lines().count();
    let docstring_re = Regex::new(r#"(?s)""".*?"""|'''.*?'''"#).expect("valid regex");
    let has_docstring = docstring_re.is_match(code);

    let mut readability: f64 = 0.7;
    if has_docstring {
        readability += 0.1;
    }
    if line_count > 30 {
        readability -= 0.1;
        suggestions.push("Test is quite long, consider splitting".to_string());
    }
    if line_count < 3 {
        readability -= 0.2;
        issues.push("Test seems too short".to_string());
    }
    readability = readability.clamp(0.0, 1.0);

    let hardcoded_re = Regex::new(r"http://localhost:\d+").expect("valid regex");
    if hardcoded_re.is_match(code) {
        suggestions.push("Consider using a base_url fixture instead of hardcoded URL".to_string());
    }

    let overall_score = assertion_quality * 0.4 + coverage_breadth * 0.3 + readability * 0.3;

    QualityScore {
        test_name: test.name.clone(),
        assertion_count,
        assertion_quality,
        coverage_breadth,
        readability,
        overall_score,
        issues,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{TestResult, TestStatus};

    fn candidate(code: &str) -> CandidateTest {
        CandidateTest {
            id: "1".to_string(),
            name: "test_sample".to_string(),
            source_code: code.to_string(),
            test_category: "api".to_string(),
            target_endpoint: None,
            target_method: None,
        }
    }

    #[test]
    fn test_no_assertions_scores_zero_quality() {
        let score = score_test(&candidate("def test_sample():\n    response = get()\n    pass"));
        assert_eq!(score.assertion_count, 0);
        assert_eq!(score.assertion_quality, 0.0);
        assert!(score.issues.contains(&"No assertions found".to_string()));
    }

    #[test]
    fn test_single_assertion_scores_half() {
        let code = "def test_sample():\n    r = client.get(url)\n    assert r.status_code == 200";
        let score = score_test(&candidate(code));
        assert_eq!(score.assertion_count, 1);
        assert!((score.assertion_quality - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_status_check_penalized() {
        let code = "def test_sample():\n    data = r.json()\n    assert data\n    assert len(data) > 0";
        let score = score_test(&candidate(code));
        // two assertions give 0.5, scaled by the 0.7 penalty
        assert!((score.assertion_quality - 0.35).abs() < 1e-9);
        assert!(score
            .issues
            .contains(&"Missing status code assertion".to_string()));
    }

    #[test]
    fn test_breadth_counts_independent_signals() {
        let code = r#"def test_sample():
    r = client.get(url)
    assert r.status_code == 200
    assert r.json()["id"] == 1
    assert r.headers["content-type"] == "application/json"
    with pytest.raises(KeyError):
        r.json()["missing"]
"#;
        let score = score_test(&candidate(code));
        assert!((score.coverage_breadth - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_readability_rewards_docstring() {
        let with_doc = score_test(&candidate(
            "def test_sample():\n    \"\"\"Checks the thing.\"\"\"\n    assert a == b\n    assert c",
        ));
        let without = score_test(&candidate(
            "def test_sample():\n    x = 1\n    assert a == b\n    assert c",
        ));
        assert!((with_doc.readability - 0.8).abs() < 1e-9);
        assert!((without.readability - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_readability_stays_in_unit_range() {
        let body: String = (0..40).map(|i| format!("    assert x{} == {}\n", i, i)).collect();
        let long = score_test(&candidate(&format!("def test_sample():\n{}", body)));
        assert!((0.0..=1.0).contains(&long.readability));
        assert!((long.readability - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_too_short_test_flagged() {
        let score = score_test(&candidate("def test_sample(): assert True"));
        assert!(score.issues.contains(&"Test seems too short".to_string()));
        assert!((score.readability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_hardcoded_url_suggestion() {
        let code =
            "def test_sample():\n    r = requests.get(\"http://localhost:5000/api\")\n    assert r.ok";
        let score = score_test(&candidate(code));
        assert!(score
            .suggestions
            .iter()
            .any(|s| s.contains("base_url fixture")));
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let code = "def test_sample():\n    r = client.get(url)\n    assert r.status_code == 200";
        let score = score_test(&candidate(code));
        let expected =
            score.assertion_quality * 0.4 + score.coverage_breadth * 0.3 + score.readability * 0.3;
        assert!((score.overall_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_summary_includes_execution_stats() {
        let suite = TestSuite {
            name: "suite".to_string(),
            tests: vec![candidate(
                "def test_sample():\n    r = client.get(url)\n    assert r.status_code == 200",
            )],
            ..Default::default()
        };
        let execution = ExecutionResult::new(
            "suite",
            vec![TestResult::new("test_sample", TestStatus::Passed)],
        );
        let result = validate_suite(&suite, Some(execution), Vec::new());
        assert!(result.summary.contains("Tests: 1"));
        assert!(result.summary.contains("Passed: 1/1"));
        assert!(result.summary.contains("Pass rate: 100%"));
    }

    #[test]
    fn test_empty_suite_has_zero_average() {
        let result = validate_suite(&TestSuite::default(), None, Vec::new());
        assert_eq!(result.avg_quality_score, 0.0);
    }
}
