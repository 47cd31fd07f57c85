//! Test case descriptors and their per-case configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mapping::TestCommand;

/// Name of the optional per-case configuration file.
pub const CASE_CONFIG_FILE: &str = "test.yaml";

/// Optional configuration of a single test case, read from `test.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseConfig {
    /// The test is known to fail; pass/fail polarity is inverted.
    pub expected_failure: bool,
    /// Timeout override in seconds.
    pub timeout_secs: Option<u64>,
    /// Capabilities the test needs (e.g. "ssl").
    pub requires: Vec<String>,
    /// Free-form tags usable by filters.
    pub tags: Vec<String>,
    /// Extra arguments appended to the test command.
    pub args: Vec<String>,
}

impl CaseConfig {
    /// Loads `test.yaml` from `dir`; a missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, String> {
        let path = dir.join(CASE_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| format!("Invalid {}: {}", path.display(), e))?;
        if config.timeout_secs == Some(0) {
            return Err(format!(
                "Invalid {}: timeout_secs must be greater than 0",
                path.display()
            ));
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// One discovered test of one mapping.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    /// Owning mapping name.
    pub mapping: String,
    /// Stable `/`-separated identifier relative to the mapping's test root.
    pub id: String,
    /// Directory of the test.
    pub dir: PathBuf,
    /// Command running the test.
    pub command: TestCommand,
    /// Environment of the test process.
    pub env: Vec<(String, String)>,
    /// Per-case configuration.
    pub config: CaseConfig,
    /// Set when `test.yaml` exists but could not be used.
    pub config_error: Option<String>,
}

impl TestCase {
    pub fn is_expected_failure(&self) -> bool {
        self.config.expected_failure
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.config.tags.iter().any(|t| t == tag)
    }

    /// Required capabilities not present in `available`.
    pub fn missing_capabilities<'a, I>(&self, available: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String> + Clone,
    {
        self.config
            .requires
            .iter()
            .filter(|req| !available.clone().into_iter().any(|a| a == *req))
            .cloned()
            .collect()
    }
}
