use anyhow::Result;
use std::path::PathBuf;

/// Resolve the python interpreter used to launch pytest.
///
/// Order: explicit override, then `python3`/`python` on the system PATH.
pub fn find_python(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Ok(candidate);
        }
        if let Ok(resolved) = which::which(path) {
            return Ok(resolved);
        }
        anyhow::bail!("Configured python binary not found: {}", path);
    }

    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(anyhow::anyhow!(
        "Could not find a python interpreter on PATH. Install python3 or set FORGE_PYTHON."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_override_fails() {
        let result = find_python(Some("/nonexistent/python-binary"));
        assert!(result.is_err());
    }
}
