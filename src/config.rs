//! Suite configuration file.
//!
//! A YAML file describing which mappings exist, where their trees live and
//! the defaults of a run. Relative paths are resolved against `base_dir`,
//! which itself defaults to the directory holding the file. The resolved
//! `base_dir` is always absolute.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::mapping::{Mapping, MappingKind, MappingRegistry};
use crate::runner::RunConfig;

/// One mapping entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    pub name: String,
    /// Language kind (`cpp` or `java`).
    pub kind: String,
    /// Root of the mapping's tree; defaults to `<base_dir>/<name>`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Runtime launcher, e.g. the `java` executable.
    #[serde(default)]
    pub launcher: Option<PathBuf>,
    /// Directory below the root holding the tests.
    #[serde(default)]
    pub test_dir: Option<String>,
    /// Extra variables for every test of the mapping.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Run defaults of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub capabilities: Vec<String>,
    pub scratch_root: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

/// Parsed suite configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Directory relative paths are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Mappings in registration order; empty means the built-in cpp and java.
    pub mappings: Vec<MappingEntry>,
    pub run: RunSection,
}

impl SuiteConfig {
    /// Configuration used when no file is given: built-in mappings below `base_dir`.
    pub fn builtin(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Default::default()
        }
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let config = Self::from_yaml_str(&content, config_dir)?;
        debug!(path = %path.display(), mappings = config.mappings.len(), "Loaded suite config");
        Ok(config)
    }

    /// Parses YAML; relative paths are anchored at `config_dir`, and a
    /// relative `config_dir` at the current directory.
    pub fn from_yaml_str(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: SuiteConfig = if content.trim().is_empty() {
            SuiteConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let base_dir = match config.base_dir.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        };
        let base_dir = std::path::absolute(&base_dir).map_err(|source| ConfigError::BaseDir {
            path: base_dir.clone(),
            source,
        })?;
        config.base_dir = Some(base_dir);

        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.mappings.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(invalid(format!("mappings[{}].name", index), "must not be empty"));
            }
            entry
                .kind
                .parse::<MappingKind>()
                .map_err(|e| invalid(format!("mappings[{}].kind", index), e))?;
            if entry.test_dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
                return Err(invalid(format!("mappings[{}].test_dir", index), "must not be empty"));
            }
        }

        if self.run.workers == Some(0) {
            return Err(invalid("run.workers", "must be greater than 0"));
        }
        if self.run.timeout_secs == Some(0) {
            return Err(invalid("run.timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    /// Resolved base directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Builds the mapping registry described by this configuration.
    pub fn to_registry(&self) -> Result<MappingRegistry, ConfigError> {
        let base_dir = self.base_dir();
        if self.mappings.is_empty() {
            return Ok(MappingRegistry::with_defaults(&base_dir));
        }

        let mut registry = MappingRegistry::new();
        for (index, entry) in self.mappings.iter().enumerate() {
            let kind = entry
                .kind
                .parse::<MappingKind>()
                .map_err(|e| invalid(format!("mappings[{}].kind", index), e))?;
            let root = match &entry.root {
                Some(root) => base_dir.join(root),
                None => base_dir.join(&entry.name),
            };

            let mut mapping = Mapping::new(entry.name.clone(), kind, root);
            if let Some(test_dir) = &entry.test_dir {
                mapping = mapping.with_test_dir(test_dir.clone());
            }
            if let Some(launcher) = &entry.launcher {
                mapping = mapping.with_launcher(resolve_program(&base_dir, launcher));
            }
            for (key, value) in &entry.env {
                mapping = mapping.with_env(key.clone(), value.clone());
            }
            registry.register(mapping)?;
        }
        Ok(registry)
    }

    /// Applies the file's run defaults on top of `config`.
    pub fn apply_run_defaults(&self, mut config: RunConfig) -> RunConfig {
        if let Some(workers) = self.run.workers {
            config = config.with_workers(workers);
        }
        if let Some(secs) = self.run.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.run.retries {
            config = config.with_retries(retries);
        }
        for capability in &self.run.capabilities {
            config = config.with_capability(capability.clone());
        }
        if let Some(scratch) = &self.run.scratch_root {
            config = config.with_scratch_root(self.base_dir().join(scratch));
        }
        for (key, value) in &self.run.env {
            config = config.with_env(key.clone(), value.clone());
        }
        config
    }
}

fn invalid(key: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        message: message.into(),
    }
}

/// Bare program names stay as-is so they are looked up on `PATH`.
fn resolve_program(base_dir: &Path, program: &Path) -> PathBuf {
    if program.is_absolute() || program.components().count() == 1 {
        program.to_path_buf()
    } else {
        base_dir.join(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    const SAMPLE: &str = r#"
mappings:
  - name: cpp
    kind: cpp
    root: cpp
  - name: java
    kind: java
    root: java
    launcher: /usr/bin/java
    env: { ICE_HOME: /opt/ice }
run:
  workers: 2
  timeout_secs: 30
  retries: 1
  capabilities: [ssl, ipv6]
"#;

    #[test]
    fn test_parse_sample() {
        let config = SuiteConfig::from_yaml_str(SAMPLE, Path::new("/src/tree")).unwrap();
        assert_eq!(config.base_dir(), PathBuf::from("/src/tree"));

        let registry = config.to_registry().unwrap();
        assert_eq!(registry.names(), vec!["cpp", "java"]);

        let java = registry.get_by_name("java").unwrap();
        assert_eq!(java.kind(), MappingKind::Java);
        assert_eq!(java.root(), Path::new("/src/tree/java"));
        assert_eq!(java.launcher(), Some(Path::new("/usr/bin/java")));
        assert!(java
            .environment()
            .contains(&("ICE_HOME".to_string(), "/opt/ice".to_string())));
    }

    #[test]
    fn test_run_defaults_applied() {
        let config = SuiteConfig::from_yaml_str(SAMPLE, Path::new("/src/tree")).unwrap();
        let run = config.apply_run_defaults(RunConfig::new());
        assert_eq!(run.workers, 2);
        assert_eq!(run.timeout, Duration::from_secs(30));
        assert_eq!(run.retries, 1);
        assert!(run.capabilities.contains("ipv6"));
    }

    #[test]
    fn test_relative_base_dir() {
        let config = SuiteConfig::from_yaml_str("base_dir: ../ice\n", Path::new("/etc/suite")).unwrap();
        assert_eq!(config.base_dir(), PathBuf::from("/etc/suite/../ice"));

        let registry = config.to_registry().unwrap();
        assert_eq!(registry.names(), vec!["cpp", "java"]);
        assert_eq!(
            registry.get_by_name("cpp").unwrap().root(),
            Path::new("/etc/suite/../ice/cpp")
        );
    }

    #[test]
    fn test_relative_config_dir_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();

        let config = SuiteConfig::from_yaml_str("base_dir: tree\n", Path::new(".")).unwrap();
        assert!(config.base_dir().is_absolute());
        assert_eq!(config.base_dir(), cwd.join("tree"));

        let config = SuiteConfig::from_yaml_str("", Path::new("suites")).unwrap();
        assert_eq!(config.base_dir(), cwd.join("suites"));
        let registry = config.to_registry().unwrap();
        assert_eq!(registry.get_by_name("cpp").unwrap().root(), cwd.join("suites/cpp"));
    }

    #[test]
    fn test_empty_file_is_builtin() {
        let config = SuiteConfig::from_yaml_str("", Path::new("/x")).unwrap();
        assert!(config.mappings.is_empty());
        assert_eq!(config.to_registry().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let yaml = "mappings:\n  - name: py\n    kind: python\n";
        let err = SuiteConfig::from_yaml_str(yaml, Path::new("/x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "mappings[0].kind"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = SuiteConfig::from_yaml_str("run:\n  workers: 0\n", Path::new("/x")).unwrap_err();
        assert!(err.to_string().contains("run.workers"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SuiteConfig::from_yaml_str("mapings: []\n", Path::new("/x")).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_duplicate_mapping_rejected() {
        let yaml = "mappings:\n  - { name: cpp, kind: cpp }\n  - { name: cpp, kind: cpp }\n";
        let config = SuiteConfig::from_yaml_str(yaml, Path::new("/x")).unwrap();
        let err = config.to_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::DuplicateMapping(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, "mappings:\n  - { name: native, kind: cpp, test_dir: tests }\n").unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        let registry = config.to_registry().unwrap();
        let native = registry.get_by_name("native").unwrap();
        assert_eq!(native.root(), dir.path().join("native"));
        assert_eq!(native.test_root(), dir.path().join("native/tests"));

        let missing = SuiteConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn test_resolve_program() {
        let base = Path::new("/base");
        assert_eq!(resolve_program(base, Path::new("java")), PathBuf::from("java"));
        assert_eq!(resolve_program(base, Path::new("/opt/java")), PathBuf::from("/opt/java"));
        assert_eq!(resolve_program(base, Path::new("jdk/bin/java")), PathBuf::from("/base/jdk/bin/java"));
    }
}
