//! Configuration for test runs.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-test timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of tests executed concurrently.
    pub workers: usize,
    /// Timeout for tests without their own override.
    pub timeout: Duration,
    /// Extra executions allowed for timed-out or errored tests.
    pub retries: u32,
    /// Capabilities available in this environment (e.g. "ssl").
    pub capabilities: BTreeSet<String>,
    /// Parent directory of per-test scratch directories (system temp if unset).
    pub scratch_root: Option<PathBuf>,
    /// Environment variables passed to every test.
    pub env_vars: Vec<(String, String)>,
}

impl RunConfig {
    /// Creates a sequential configuration with defaults.
    pub fn new() -> Self {
        Self {
            workers: 1,
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            capabilities: BTreeSet::new(),
            scratch_root: None,
            env_vars: Vec::new(),
        }
    }

    /// Sets the number of workers (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Declares a capability as available.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new();
        assert_eq!(config.workers, 1);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retries, 0);
        assert!(config.capabilities.is_empty());
        assert!(config.scratch_root.is_none());
    }

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new()
            .with_workers(0)
            .with_timeout(Duration::from_secs(10))
            .with_retries(2)
            .with_capability("ssl")
            .with_env("ICE_TRACE", "1");

        assert_eq!(config.workers, 1);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retries, 2);
        assert!(config.capabilities.contains("ssl"));
        assert_eq!(config.env_vars.len(), 1);
    }
}
