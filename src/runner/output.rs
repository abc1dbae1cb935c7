//! Parsing of pytest transcripts into per-test results.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use super::state::{TestResult, TestStatus};

fn status_from_str(s: &str) -> TestStatus {
    match s {
        "PASSED" => TestStatus::Passed,
        "FAILED" => TestStatus::Failed,
        "ERROR" => TestStatus::Error,
        _ => TestStatus::Skipped,
    }
}

/// Parse pytest `-v` output, layered from most to least structured:
/// verbose per-test lines, then the short summary, then a single
/// synthetic result inferred from the whole transcript.
pub fn parse_pytest_output(stdout: &str, stderr: &str) -> Vec<TestResult> {
    let failure_details = parse_failure_sections(stdout);

    let verbose_re = Regex::new(r"^.*?::(\w+)\s+(PASSED|FAILED|ERROR|SKIPPED)\s*(\[.*\])?")
        .expect("valid regex");

    let mut results = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line in stdout.lines() {
        let line = line.trim();
        let Some(cap) = verbose_re.captures(line) else {
            continue;
        };
        let name = cap[1].to_string();
        if !seen.insert(name.clone()) {
            continue;
        }
        let status = status_from_str(&cap[2]);
        let error_message = if status == TestStatus::Failed {
            failure_details.get(&name).cloned()
        } else {
            None
        };
        results.push(TestResult {
            test_name: name,
            status,
            error_message,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            ..TestResult::new("", status)
        });
    }

    if results.is_empty() {
        let summary_re = Regex::new(r"^FAILED\s+.*?::(\w+)").expect("valid regex");
        for line in stdout.lines() {
            let Some(cap) = summary_re.captures(line.trim()) else {
                continue;
            };
            let name = cap[1].to_string();
            if !seen.insert(name.clone()) {
                continue;
            }
            results.push(TestResult {
                test_name: name,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                ..TestResult::new("", TestStatus::Failed)
            });
        }
    }

    if results.is_empty() {
        let has_failures = stdout.contains("FAILED") || stdout.contains("ERROR");
        let status = if has_failures {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        };
        results.push(TestResult {
            test_name: "<suite>".to_string(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            ..TestResult::new("", status)
        });
    }

    results
}

/// Failure detail blocks from the FAILURES banner section, keyed by
/// test name.
fn parse_failure_sections(stdout: &str) -> HashMap<String, String> {
    let banner_re = Regex::new(r"={3,}\s*FAILURES\s*={3,}").expect("valid regex");
    let mut details = HashMap::new();

    let Some(banner) = banner_re.find(stdout) else {
        return details;
    };
    let section = &stdout[banner.end()..];

    let block_re = Regex::new(r"(?s)_{3,}\s*(\w+)\s*_{3,}\n(.*?)(?:_{3,}|\z)").expect("valid regex");
    let mut rest = section;
    while let Some(cap) = block_re.captures(rest) {
        let name = cap[1].to_string();
        let body = cap[2].trim().to_string();
        details.insert(name, body);

        // resume at the closing underscores so the next header is found
        let body_end = cap.get(2).expect("body").end();
        if body_end >= rest.len() {
            break;
        }
        rest = &rest[body_end..];
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERBOSE_OUTPUT: &str = "\
============================= test session starts ==============================
collected 3 items

test_sample.py::test_create_user PASSED                                  [ 33%]
test_sample.py::test_get_user FAILED                                     [ 66%]
test_sample.py::test_delete_user SKIPPED                                 [100%]

=================================== FAILURES ===================================
________________________________ test_get_user _________________________________
    def test_get_user(base_url):
>       assert response.status_code == 200
E       assert 404 == 200
=========================== short test summary info ============================
FAILED test_sample.py::test_get_user - assert 404 == 200
========================= 1 failed, 1 passed, 1 skipped ========================
";

    #[test]
    fn test_verbose_lines_parsed() {
        let results = parse_pytest_output(VERBOSE_OUTPUT, "");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].test_name, "test_create_user");
        assert_eq!(results[0].status, TestStatus::Passed);
        assert_eq!(results[1].status, TestStatus::Failed);
        assert_eq!(results[2].status, TestStatus::Skipped);
    }

    #[test]
    fn test_failure_detail_attached() {
        let results = parse_pytest_output(VERBOSE_OUTPUT, "");
        let failed = &results[1];
        let message = failed.error_message.as_deref().unwrap();
        assert!(message.contains("assert 404 == 200"));
        // only failed tests carry a detail message
        assert!(results[0].error_message.is_none());
    }

    #[test]
    fn test_first_occurrence_wins_for_duplicate_names() {
        let output = "\
test_sample.py::test_a PASSED [ 50%]
test_sample.py::test_a FAILED [100%]
";
        let results = parse_pytest_output(output, "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, TestStatus::Passed);
    }

    #[test]
    fn test_short_summary_fallback() {
        let output = "\
collecting tests...
FAILED test_sample.py::test_broken - ImportError
1 failed in 0.12s
";
        let results = parse_pytest_output(output, "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "test_broken");
        assert_eq!(results[0].status, TestStatus::Failed);
    }

    #[test]
    fn test_whole_output_inference_failed() {
        let results = parse_pytest_output("ERROR: could not collect tests", "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "<suite>");
        assert_eq!(results[0].status, TestStatus::Failed);
    }

    #[test]
    fn test_whole_output_inference_passed() {
        let results = parse_pytest_output("2 passed in 0.05s", "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, TestStatus::Passed);
    }
}
