use anyhow::Result;
use std::path::Path;

use crate::validator::ValidationResult;

/// Write a validation report as pretty JSON, to a file or stdout.
pub fn generate(result: &ValidationResult, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TestSuite;
    use crate::validator::validate_suite;

    #[test]
    fn test_report_written_to_file() {
        let result = validate_suite(
            &TestSuite {
                name: "suite".to_string(),
                ..Default::default()
            },
            None,
            Vec::new(),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        generate(&result, Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: ValidationResult = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.suite_name, "suite");
    }
}
