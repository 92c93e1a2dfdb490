//! Collector configuration, loaded from YAML.
//!
//! ```yaml
//! targets: [esp32, esp32s2, esp32s3]
//! file_prefix: pytest_
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::errors::CaseError;

const DEFAULT_TARGETS: &[&str] = &[
    "esp32", "esp32s2", "esp32s3", "esp32c2", "esp32c3", "esp32c5", "esp32c6", "esp32c61",
    "esp32h2", "esp32p4", "linux",
];

const DEFAULT_FILE_PREFIX: &str = "pytest_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Mark names that denote a target. Any other `pytest.mark.*` is ignored.
    pub targets: Vec<String>,
    /// Only `.py` files whose name starts with this prefix are scanned.
    pub file_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Reads a YAML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, CaseError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CaseError::discovery_with(format!("Failed to read config '{}'", path.display()), e)
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            CaseError::discovery_with(format!("Invalid config '{}'", path.display()), e)
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, CaseError> {
        serde_yaml::from_str(text).map_err(|e| CaseError::discovery_with("Invalid config", e))
    }

    pub fn is_target(&self, name: &str) -> bool {
        self.targets.iter().any(|t| t == name)
    }

    /// True when `file_name` looks like a test module this collector scans.
    pub fn is_test_file(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.file_prefix) && file_name.ends_with(".py")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_target("esp32s3"));
        assert!(!config.is_target("generic"));
        assert!(config.is_test_file("pytest_uart.py"));
        assert!(!config.is_test_file("conftest.py"));
        assert!(!config.is_test_file("pytest_uart.pyc"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("targets: [esp32, linux]\n").unwrap();
        assert_eq!(config.targets, vec!["esp32", "linux"]);
        assert_eq!(config.file_prefix, "pytest_");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::from_yaml("target: [esp32]\n").is_err());
    }
}
