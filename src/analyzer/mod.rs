pub mod python;
pub mod style;
pub mod types;

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use log::{debug, warn};

pub use types::{
    AssertionPattern, AssertionStyle, FixturePattern, Framework, GoldenExample, HttpClient,
    ImportPattern, StyleModel, TestFunctionPattern,
};

/// Golden examples to learn from, as paths and/or raw sources.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerInput {
    pub golden_file_paths: Vec<PathBuf>,
    pub golden_sources: Vec<String>,
}

/// Parse all golden examples and aggregate them into a style model.
///
/// A file that cannot be read or parsed contributes an empty example
/// instead of failing the whole analysis.
pub fn analyze(input: &AnalyzerInput) -> Result<StyleModel> {
    let mut examples = Vec::new();

    for path in &input.golden_file_paths {
        let display = path.display().to_string();
        let example = match fs::read_to_string(path) {
            Ok(source) => python::parse_python_source(&source, &display).unwrap_or_else(|err| {
                warn!("Failed to parse {}: {}", display, err);
                GoldenExample {
                    file_path: display.clone(),
                    ..Default::default()
                }
            }),
            Err(err) => {
                warn!("Failed to read {}: {}", display, err);
                GoldenExample {
                    file_path: display.clone(),
                    ..Default::default()
                }
            }
        };
        debug!(
            "Parsed {}: {} tests, {} fixtures",
            display,
            example.test_functions.len(),
            example.fixtures.len()
        );
        examples.push(example);
    }

    for (i, source) in input.golden_sources.iter().enumerate() {
        let name = format!("<uploaded_{}.py>", i);
        let example = python::parse_python_source(source, &name).unwrap_or_else(|err| {
            warn!("Failed to parse {}: {}", name, err);
            GoldenExample {
                file_path: name.clone(),
                source_code: source.clone(),
                ..Default::default()
            }
        });
        examples.push(example);
    }

    style::build_style_model(examples)
}
