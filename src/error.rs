//! Error types for suite-runner operations.
//!
//! Only mapping resolution, discovery and configuration failures are errors.
//! Everything that happens to an individual test case is recorded as data in
//! a [`crate::runner::TestResult`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the mapping registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown mapping '{0}'")]
    UnknownMapping(String),

    #[error("Mapping '{0}' is registered more than once")]
    DuplicateMapping(String),

    #[error("Mapping name must not be empty")]
    EmptyName,

    #[error("A mapping registry is already installed for this process")]
    AlreadyInstalled,
}

/// Errors raised while enumerating the tests of one mapping.
///
/// A discovery error means the mapping's build or checkout is broken; it
/// aborts that mapping's tests but never the other mappings of the run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Test root '{}' of mapping '{mapping}' does not exist", path.display())]
    MissingRoot { mapping: String, path: PathBuf },

    #[error("Test root '{}' of mapping '{mapping}' is not a directory", path.display())]
    NotADirectory { mapping: String, path: PathBuf },

    #[error("Test root '{}' of mapping '{mapping}' is unreadable: {source}", path.display())]
    UnreadableRoot {
        mapping: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk test tree of mapping '{mapping}': {message}")]
    Walk { mapping: String, message: String },
}

impl DiscoveryError {
    /// Name of the mapping whose discovery failed.
    pub fn mapping(&self) -> &str {
        match self {
            DiscoveryError::MissingRoot { mapping, .. }
            | DiscoveryError::NotADirectory { mapping, .. }
            | DiscoveryError::UnreadableRoot { mapping, .. }
            | DiscoveryError::Walk { mapping, .. } => mapping,
        }
    }
}

/// Errors raised while loading the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to resolve base directory '{}': {source}", path.display())]
    BaseDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors raised while launching one test process.
///
/// These never escape the executor; they become an Errored result.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to create sandbox: {0}")]
    Sandbox(#[source] std::io::Error),

    #[error("Failed to spawn '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for test process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors that abort a whole run before any test executes.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No mappings selected")]
    NoMappings,
}
