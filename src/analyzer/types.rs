use serde::{Deserialize, Serialize};

/// An observed import statement from an example file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPattern {
    pub module: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub is_from_import: bool,
}

impl ImportPattern {
    /// Dedup key used for frequency counting across files.
    pub fn key(&self) -> String {
        if self.is_from_import {
            format!("{}:{}", self.module, self.names.join(","))
        } else {
            self.module.clone()
        }
    }

    /// Render back to a python import statement.
    pub fn render(&self) -> String {
        if self.is_from_import {
            format!("from {} import {}", self.module, self.names.join(", "))
        } else if let Some(alias) = &self.alias {
            format!("import {} as {}", self.module, alias)
        } else {
            format!("import {}", self.module)
        }
    }
}

/// An observed pytest fixture declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixturePattern {
    pub name: String,
    pub scope: String,
    /// Whether the fixture yields (setup/teardown pattern)
    #[serde(default)]
    pub yields: bool,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub body_summary: String,
}

/// Classified assertion style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionStyle {
    /// plain `assert ...`
    Assert,
    /// `pytest.raises(...)` exception expectation
    Raises,
    /// unittest-style `self.assert*` equality assertion
    AssertEqual,
}

impl AssertionStyle {
    pub fn label(&self) -> &'static str {
        match self {
            AssertionStyle::Assert => "assert",
            AssertionStyle::Raises => "pytest.raises",
            AssertionStyle::AssertEqual => "assertEqual",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPattern {
    pub style: AssertionStyle,
    /// The observed statement, e.g. `assert response.status_code == 200`
    pub pattern: String,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

fn default_frequency() -> u32 {
    1
}

/// Pattern extracted from a single test function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFunctionPattern {
    pub name: String,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    /// Parameter names, i.e. candidate fixture dependencies
    #[serde(default)]
    pub fixtures_used: Vec<String>,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub assertions: Vec<AssertionPattern>,
    #[serde(default)]
    pub body_summary: String,
    #[serde(default)]
    pub line_count: usize,
}

/// A parsed golden test file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldenExample {
    pub file_path: String,
    pub source_code: String,
    #[serde(default)]
    pub imports: Vec<ImportPattern>,
    #[serde(default)]
    pub fixtures: Vec<FixturePattern>,
    #[serde(default)]
    pub test_functions: Vec<TestFunctionPattern>,
    #[serde(default)]
    pub helper_functions: Vec<String>,
    #[serde(default)]
    pub class_names: Vec<String>,
}

/// Declared test framework detected across golden examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Pytest,
    Unittest,
}

/// HTTP client convention detected across golden examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpClient {
    Requests,
    Httpx,
    Aiohttp,
    TestClient,
}

impl HttpClient {
    pub fn label(&self) -> &'static str {
        match self {
            HttpClient::Requests => "requests",
            HttpClient::Httpx => "httpx",
            HttpClient::Aiohttp => "aiohttp",
            HttpClient::TestClient => "test_client",
        }
    }
}

/// Aggregated style conventions from all golden examples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleModel {
    pub framework: Framework,
    pub http_client: HttpClient,
    #[serde(default)]
    pub class_based: bool,

    #[serde(default)]
    pub common_imports: Vec<ImportPattern>,
    #[serde(default)]
    pub common_fixtures: Vec<FixturePattern>,
    /// Five most frequent assertion styles with counts
    #[serde(default)]
    pub common_assertions: Vec<AssertionPattern>,
    /// Five most frequent decorators
    #[serde(default)]
    pub common_decorators: Vec<String>,

    #[serde(default)]
    pub avg_assertions_per_test: f64,
    #[serde(default)]
    pub avg_test_lines: f64,
    #[serde(default)]
    pub uses_docstrings: bool,
    #[serde(default)]
    pub uses_parametrize: bool,

    #[serde(default)]
    pub golden_examples: Vec<GoldenExample>,
}

impl Default for StyleModel {
    fn default() -> Self {
        Self {
            framework: Framework::Pytest,
            http_client: HttpClient::Requests,
            class_based: false,
            common_imports: Vec::new(),
            common_fixtures: Vec::new(),
            common_assertions: Vec::new(),
            common_decorators: Vec::new(),
            avg_assertions_per_test: 0.0,
            avg_test_lines: 0.0,
            uses_docstrings: false,
            uses_parametrize: false,
            golden_examples: Vec::new(),
        }
    }
}
