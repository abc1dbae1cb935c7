use serde::{Deserialize, Serialize};

/// One generated test function, split out of the LLM response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTest {
    pub id: String,
    pub name: String,
    pub source_code: String,
    #[serde(default = "default_category")]
    pub test_category: String,
    #[serde(default)]
    pub target_endpoint: Option<String>,
    #[serde(default)]
    pub target_method: Option<String>,
}

fn default_category() -> String {
    "api".to_string()
}

/// A collection of generated tests plus their shared preamble.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tests: Vec<CandidateTest>,
    /// Shared imports block
    #[serde(default)]
    pub imports_code: String,
    /// Shared fixtures/setup between imports and the first test
    #[serde(default)]
    pub setup_code: String,
    #[serde(default)]
    pub conftest_code: String,
    #[serde(default)]
    pub target_app: String,
    #[serde(default)]
    pub base_url: String,
}

impl TestSuite {
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Render the full test file content.
    pub fn to_file_content(&self) -> String {
        let mut parts = Vec::new();
        if !self.imports_code.trim().is_empty() {
            parts.push(self.imports_code.trim().to_string());
        }
        if !self.setup_code.trim().is_empty() {
            parts.push(self.setup_code.trim().to_string());
        }
        for test in &self.tests {
            parts.push(test.source_code.trim().to_string());
        }
        format!("{}\n", parts.join("\n\n\n"))
    }
}
