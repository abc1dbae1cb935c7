pub mod gateway;
pub mod prompts;
pub mod types;

use anyhow::Result;
use log::info;
use regex::Regex;
use uuid::Uuid;

use crate::analyzer::StyleModel;
use crate::mapper::types::EndpointMap;
use gateway::LlmGateway;
pub use types::{CandidateTest, TestSuite};

const DETECTABLE_VERBS: &[&str] = &["get", "post", "put", "patch", "delete"];

/// Everything the generator needs for one request.
#[derive(Debug, Clone)]
pub struct GeneratorInput {
    pub style: StyleModel,
    pub endpoint_map: Option<EndpointMap>,
    pub app_description: String,
    pub base_url: String,
    pub num_tests: usize,

    // prior-coverage context carried across runs
    pub tested_endpoints: Vec<String>,
    pub untested_endpoints: Vec<String>,
    pub coverage_gaps: Vec<String>,
    pub known_test_names: Vec<String>,
}

impl GeneratorInput {
    pub fn new(style: StyleModel) -> Self {
        Self {
            style,
            endpoint_map: None,
            app_description: String::new(),
            base_url: "http://localhost:5000".to_string(),
            num_tests: 10,
            tested_endpoints: Vec::new(),
            untested_endpoints: Vec::new(),
            coverage_gaps: Vec::new(),
            known_test_names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    pub test_suite: TestSuite,
    pub raw_llm_response: String,
}

/// Build the generation prompt, call the gateway, and split the response
/// into a test suite.
pub async fn generate(gateway: &dyn LlmGateway, input: &GeneratorInput) -> Result<GeneratorOutput> {
    let golden_sources: Vec<String> = input
        .style
        .golden_examples
        .iter()
        .map(|ex| ex.source_code.clone())
        .collect();
    let style_context = prompts::build_style_context(&golden_sources);

    let prompt = match &input.endpoint_map {
        Some(map) if !map.endpoints.is_empty() => prompts::build_endpoint_prompt(
            &style_context,
            &input.base_url,
            &input.app_description,
            &map.endpoints,
            input.num_tests,
        ),
        _ => {
            let context_section = prompts::build_context_section(
                &input.tested_endpoints,
                &input.untested_endpoints,
                &input.coverage_gaps,
                &input.known_test_names,
            );
            prompts::build_examples_only_prompt(&style_context, &context_section, input.num_tests)
        }
    };

    let raw = gateway.complete(prompts::SYSTEM_PROMPT, &prompt).await?;
    let test_suite = parse_response(&raw, input);
    info!(
        "Generated {} tests for {}",
        test_suite.test_count(),
        input.base_url
    );

    Ok(GeneratorOutput {
        test_suite,
        raw_llm_response: raw,
    })
}

/// Parse a raw LLM response into a test suite.
pub fn parse_response(raw: &str, input: &GeneratorInput) -> TestSuite {
    let code = strip_code_fences(raw);
    let tests = extract_test_functions(&code);
    let (mut imports_code, setup_code) = extract_preamble(&code);

    if imports_code.trim().is_empty() {
        imports_code = build_imports_from_style(&input.style);
    }

    TestSuite {
        name: format!("generated_api_tests_{}", short_id()),
        description: format!(
            "Auto-generated from {} golden examples",
            input.style.golden_examples.len()
        ),
        tests,
        imports_code,
        setup_code,
        conftest_code: String::new(),
        target_app: input.app_description.clone(),
        base_url: input.base_url.clone(),
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn strip_code_fences(raw: &str) -> String {
    let opening = Regex::new(r"^```python\s*\n?").expect("valid regex");
    let closing = Regex::new(r"\n?```\s*$").expect("valid regex");
    let code = raw.trim();
    let code = opening.replace(code, "");
    let code = closing.replace(&code, "");
    code.trim().to_string()
}

/// Split generated code into individual test functions. Decorators
/// directly above a `def test_` stay attached to it.
fn extract_test_functions(code: &str) -> Vec<CandidateTest> {
    let boundary = Regex::new(r"(?m)^(?:@[\w.]+(?:\(.*\))?\s*\n)*def test_\w+\s*\(")
        .expect("valid regex");

    let starts: Vec<usize> = boundary.find_iter(code).map(|m| m.start()).collect();
    let mut blocks = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(code.len());
        blocks.push(code[start..end].trim().to_string());
    }

    if blocks.is_empty() {
        // fallback for unusual formatting
        blocks = code
            .split("\ndef test_")
            .skip(1)
            .map(|part| format!("def test_{}", part.trim()))
            .collect();
    }

    let name_re = Regex::new(r"def (test_\w+)").expect("valid regex");
    let mut tests = Vec::new();
    for block in blocks {
        if block.is_empty() {
            continue;
        }
        let name = name_re
            .captures(&block)
            .map(|cap| cap[1].to_string())
            .unwrap_or_else(|| format!("test_generated_{}", tests.len()));
        let (target_method, target_endpoint) = detect_target(&block);

        tests.push(CandidateTest {
            id: short_id(),
            name,
            source_code: block,
            test_category: "api".to_string(),
            target_endpoint,
            target_method,
        });
    }
    tests
}

fn detect_target(block: &str) -> (Option<String>, Option<String>) {
    for verb in DETECTABLE_VERBS {
        let url_re = Regex::new(&format!(r#"\.{}\s*\(\s*f?["'](.*?)["']"#, verb))
            .expect("valid regex");
        if let Some(cap) = url_re.captures(block) {
            return (Some(verb.to_uppercase()), Some(cap[1].to_string()));
        }
    }
    (None, None)
}

/// Imports and setup code appearing before the first test function.
fn extract_preamble(code: &str) -> (String, String) {
    let first_test = Regex::new(r"(?m)^(?:@[\w.]+(?:\(.*\))?\s*\n)*def test_")
        .expect("valid regex");
    let Some(m) = first_test.find(code) else {
        return (String::new(), String::new());
    };

    let preamble = code[..m.start()].trim();
    let mut imports = Vec::new();
    let mut setup = Vec::new();
    let mut in_imports = true;

    for line in preamble.lines() {
        let stripped = line.trim();
        if in_imports
            && (stripped.starts_with("import ") || stripped.starts_with("from ") || stripped.is_empty())
        {
            imports.push(line);
        } else {
            in_imports = false;
            setup.push(line);
        }
    }

    (
        imports.join("\n").trim().to_string(),
        setup.join("\n").trim().to_string(),
    )
}

/// Reconstruct an imports block from learned conventions when the LLM
/// output omitted one.
fn build_imports_from_style(style: &StyleModel) -> String {
    style
        .common_imports
        .iter()
        .map(|imp| imp.render())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::types::{ImportPattern, StyleModel};

    fn input_with_imports() -> GeneratorInput {
        let mut style = StyleModel::default();
        style.common_imports = vec![
            ImportPattern {
                module: "requests".to_string(),
                names: Vec::new(),
                alias: None,
                is_from_import: false,
            },
            ImportPattern {
                module: "helpers".to_string(),
                names: vec!["make_user".to_string()],
                alias: None,
                is_from_import: true,
            },
        ];
        GeneratorInput::new(style)
    }

    #[test]
    fn test_code_fences_stripped() {
        let raw = "```python\ndef test_a():\n    assert True\n```";
        let suite = parse_response(raw, &input_with_imports());
        assert_eq!(suite.tests.len(), 1);
        assert!(suite.tests[0].source_code.starts_with("def test_a"));
        assert!(!suite.tests[0].source_code.contains("```"));
    }

    #[test]
    fn test_decorators_stay_with_their_function() {
        let raw = "\
import requests


@pytest.mark.slow
def test_a():
    assert True


def test_b():
    assert False
";
        let suite = parse_response(raw, &input_with_imports());
        assert_eq!(suite.tests.len(), 2);
        assert!(suite.tests[0].source_code.starts_with("@pytest.mark.slow"));
        assert_eq!(suite.tests[0].name, "test_a");
        assert_eq!(suite.tests[1].name, "test_b");
    }

    #[test]
    fn test_preamble_split_into_imports_and_setup() {
        let raw = "\
import requests
import pytest

BASE_URL = \"http://localhost:5000\"


def test_a():
    assert True
";
        let suite = parse_response(raw, &input_with_imports());
        assert_eq!(suite.imports_code, "import requests\nimport pytest");
        assert_eq!(suite.setup_code, "BASE_URL = \"http://localhost:5000\"");
    }

    #[test]
    fn test_missing_imports_reconstructed_from_style() {
        let raw = "def test_a():\n    assert True\n";
        let suite = parse_response(raw, &input_with_imports());
        assert_eq!(
            suite.imports_code,
            "import requests\nfrom helpers import make_user"
        );
    }

    #[test]
    fn test_target_endpoint_detected() {
        let raw = "\
def test_create_user():
    response = requests.post(f\"{base_url}/api/users\", json={})
    assert response.status_code == 201
";
        let suite = parse_response(raw, &input_with_imports());
        assert_eq!(suite.tests[0].target_method.as_deref(), Some("POST"));
        assert_eq!(
            suite.tests[0].target_endpoint.as_deref(),
            Some("{base_url}/api/users")
        );
    }

    #[tokio::test]
    async fn test_generate_uses_gateway_response() {
        let gateway = gateway::testing::CannedGateway {
            response: "def test_a():\n    assert True\n".to_string(),
        };
        let output = generate(&gateway, &input_with_imports()).await.unwrap();
        assert_eq!(output.test_suite.tests.len(), 1);
        assert_eq!(output.raw_llm_response, "def test_a():\n    assert True\n");
    }
}
