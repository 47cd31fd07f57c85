//! suite-runner: multi-language test suite runner.
//!
//! This library discovers prebuilt test programs of several language
//! mappings (C++, Java), runs them as isolated processes with timeouts,
//! retries and bounded parallelism, and aggregates their outcomes into a
//! single report.

// Core modules
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod mapping;
pub mod report;
pub mod runner;
pub mod scheduler;

// Re-export commonly used types
pub use config::SuiteConfig;
pub use discovery::{discover, discover_off_thread, TestCase, TestFilter};
pub use error::{ConfigError, DiscoveryError, ExecutorError, RegistryError, RunError};
pub use mapping::{Mapping, MappingKind, MappingRegistry};
pub use report::{summarize, RunReport, Summary};
pub use runner::{CancelHandle, CaseExecutor, RunConfig, TestExecutor, TestResult, TestStatus};
pub use scheduler::RunCoordinator;
