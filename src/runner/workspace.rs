//! Scratch directory management for a test run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::generator::TestSuite;

/// Default conftest written when the suite carries none. Gives every
/// suite a `base_url` fixture plus user setup/teardown fixtures.
fn default_conftest(base_url: &str) -> String {
    format!(
        r#"import os
import pytest
import requests


@pytest.fixture
def base_url():
    """Base URL for the API."""
    return os.environ.get("BASE_URL", "{base_url}")


@pytest.fixture
def created_user(base_url):
    """Create a user and return its data. Clean up after test."""
    payload = {{"name": "Test User", "email": f"test_{{id(object())}}@example.com", "role": "user"}}
    response = requests.post(f"{{base_url}}/api/users", json=payload)
    assert response.status_code == 201
    user = response.json()
    yield user
    requests.delete(f"{{base_url}}/api/users/{{user['id']}}")


@pytest.fixture
def sample_user(base_url):
    """Create a sample user for testing."""
    payload = {{"name": "Sample User", "email": f"sample_{{id(object())}}@example.com", "role": "admin"}}
    response = requests.post(f"{{base_url}}/api/users", json=payload)
    assert response.status_code == 201
    user = response.json()
    yield user
    requests.delete(f"{{base_url}}/api/users/{{user['id']}}")
"#
    )
}

/// On-disk layout for one suite execution. Holds the temp dir alive
/// for the duration of the run.
pub struct RunWorkspace {
    pub test_file: PathBuf,
    pub dir: PathBuf,
    // dropped last, deletes the directory
    _tempdir: Option<tempfile::TempDir>,
}

impl RunWorkspace {
    /// Write the suite and its conftest into `working_dir`, or into a
    /// fresh temp directory when none is given.
    pub fn prepare(
        suite: &TestSuite,
        base_url: &str,
        working_dir: Option<&Path>,
    ) -> Result<RunWorkspace> {
        let (dir, tempdir) = match working_dir {
            Some(path) => {
                fs::create_dir_all(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                (path.to_path_buf(), None)
            }
            None => {
                let tempdir = tempfile::Builder::new()
                    .prefix("forge_")
                    .tempdir()
                    .context("Failed to create scratch directory")?;
                (tempdir.path().to_path_buf(), Some(tempdir))
            }
        };

        let test_file = dir.join(format!("test_{}.py", suite.name));
        fs::write(&test_file, suite.to_file_content())
            .with_context(|| format!("Failed to write {}", test_file.display()))?;

        let conftest = dir.join("conftest.py");
        let conftest_content = if suite.conftest_code.is_empty() {
            default_conftest(base_url)
        } else {
            suite.conftest_code.clone()
        };
        fs::write(&conftest, conftest_content)
            .with_context(|| format!("Failed to write {}", conftest.display()))?;

        info!("Test file written: {}", test_file.display());

        Ok(RunWorkspace {
            test_file,
            dir,
            _tempdir: tempdir,
        })
    }

    /// Suite file stem, used as the execution result's suite name.
    pub fn suite_stem(&self) -> String {
        self.test_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CandidateTest;

    fn suite() -> TestSuite {
        TestSuite {
            name: "sample".to_string(),
            imports_code: "import requests".to_string(),
            tests: vec![CandidateTest {
                id: "1".to_string(),
                name: "test_a".to_string(),
                source_code: "def test_a():\n    assert True".to_string(),
                test_category: "api".to_string(),
                target_endpoint: None,
                target_method: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_writes_suite_and_default_conftest() {
        let workspace = RunWorkspace::prepare(&suite(), "http://localhost:5000", None).unwrap();
        assert_eq!(workspace.suite_stem(), "test_sample");

        let content = fs::read_to_string(&workspace.test_file).unwrap();
        assert!(content.contains("def test_a()"));

        let conftest = fs::read_to_string(workspace.dir.join("conftest.py")).unwrap();
        assert!(conftest.contains("def base_url()"));
        assert!(conftest.contains("http://localhost:5000"));
    }

    #[test]
    fn test_provided_conftest_wins() {
        let mut custom = suite();
        custom.conftest_code = "import pytest\n".to_string();
        let workspace = RunWorkspace::prepare(&custom, "http://localhost:5000", None).unwrap();
        let conftest = fs::read_to_string(workspace.dir.join("conftest.py")).unwrap();
        assert_eq!(conftest, "import pytest\n");
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let dir;
        {
            let workspace =
                RunWorkspace::prepare(&suite(), "http://localhost:5000", None).unwrap();
            dir = workspace.dir.clone();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }
}
