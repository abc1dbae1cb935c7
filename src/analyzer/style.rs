use std::collections::HashMap;

use anyhow::{bail, Result};

use super::types::{
    AssertionPattern, AssertionStyle, Framework, GoldenExample, HttpClient, StyleModel,
};

/// Aggregate parsed golden examples into a single style model.
pub fn build_style_model(examples: Vec<GoldenExample>) -> Result<StyleModel> {
    if examples.is_empty() {
        bail!("No golden examples provided or found");
    }

    let mut all_imports = Vec::new();
    let mut all_fixtures = Vec::new();
    let mut all_assertions = Vec::new();
    let mut all_decorators = Vec::new();
    let mut total_assertions = 0usize;
    let mut total_lines = 0usize;
    let mut test_count = 0usize;
    let mut docstring_count = 0usize;
    let mut parametrize_count = 0usize;
    let mut class_based = false;

    for example in &examples {
        all_imports.extend(example.imports.iter().cloned());
        all_fixtures.extend(example.fixtures.iter().cloned());
        if !example.class_names.is_empty() {
            class_based = true;
        }

        for func in &example.test_functions {
            test_count += 1;
            total_assertions += func.assertions.len();
            total_lines += func.line_count;
            all_assertions.extend(func.assertions.iter().cloned());
            all_decorators.extend(func.decorators.iter().cloned());

            if func.docstring.is_some() {
                docstring_count += 1;
            }
            if func.decorators.iter().any(|d| d.contains("parametrize")) {
                parametrize_count += 1;
            }
        }
    }

    let framework = if all_imports.iter().any(|i| i.module == "unittest") {
        Framework::Unittest
    } else {
        Framework::Pytest
    };
    let http_client = detect_http_client(&all_imports, &examples);

    // Imports appearing in at least half the files
    let threshold = std::cmp::max(1, examples.len() / 2);
    let mut import_counts: HashMap<String, usize> = HashMap::new();
    for imp in &all_imports {
        *import_counts.entry(imp.key()).or_default() += 1;
    }
    let mut common_imports = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for imp in &all_imports {
        let key = imp.key();
        if import_counts[&key] >= threshold && seen.insert(key) {
            common_imports.push(imp.clone());
        }
    }

    // Fixtures deduplicated by name, first declaration wins
    let mut common_fixtures = Vec::new();
    let mut seen_fixtures = std::collections::HashSet::new();
    for fix in &all_fixtures {
        if seen_fixtures.insert(fix.name.clone()) {
            common_fixtures.push(fix.clone());
        }
    }

    let common_assertions = top_assertion_styles(&all_assertions);
    let common_decorators = top_decorators(&all_decorators);

    Ok(StyleModel {
        framework,
        http_client,
        class_based,
        common_imports,
        common_fixtures,
        common_assertions,
        common_decorators,
        avg_assertions_per_test: total_assertions as f64 / test_count.max(1) as f64,
        avg_test_lines: total_lines as f64 / test_count.max(1) as f64,
        uses_docstrings: docstring_count * 2 > test_count,
        uses_parametrize: parametrize_count > 0,
        golden_examples: examples,
    })
}

fn detect_http_client(
    imports: &[super::types::ImportPattern],
    examples: &[GoldenExample],
) -> HttpClient {
    let mut client = HttpClient::Requests;
    for imp in imports {
        if imp.module == "httpx" || (imp.is_from_import && imp.module.contains("httpx")) {
            client = HttpClient::Httpx;
            break;
        }
        if imp.module == "aiohttp" || (imp.is_from_import && imp.module.contains("aiohttp")) {
            client = HttpClient::Aiohttp;
            break;
        }
    }

    // Framework test client usage trumps import-based detection
    if examples
        .iter()
        .any(|ex| ex.source_code.contains("test_client") || ex.source_code.contains("TestClient"))
    {
        client = HttpClient::TestClient;
    }
    client
}

/// Five most frequent assertion styles with their occurrence counts.
fn top_assertion_styles(assertions: &[AssertionPattern]) -> Vec<AssertionPattern> {
    let mut counts: HashMap<AssertionStyle, u32> = HashMap::new();
    for a in assertions {
        *counts.entry(a.style).or_default() += 1;
    }
    let mut ranked: Vec<(AssertionStyle, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.label().cmp(b.0.label())));
    ranked
        .into_iter()
        .take(5)
        .map(|(style, frequency)| AssertionPattern {
            style,
            pattern: style.label().to_string(),
            frequency,
        })
        .collect()
}

fn top_decorators(decorators: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for d in decorators {
        *counts.entry(d.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked.into_iter().take(5).map(|(d, _)| d.to_string()).collect()
}
