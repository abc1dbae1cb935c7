pub mod json;

use anyhow::Result;
use std::path::Path;

use crate::validator::ValidationResult;

/// Re-render a saved validation result in the requested format.
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(results_path)?;
    let result: ValidationResult = serde_json::from_str(&content)?;

    match format {
        "json" => json::generate(&result, output),
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
