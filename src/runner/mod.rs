//! Test execution.
//!
//! Runs a single discovered test case as an isolated child process and
//! turns its termination into a [`TestResult`].
//!
//! # Architecture
//!
//! ```text
//! TestCase → Sandbox → ChildGuard (own process group) → capture → classify → TestResult
//! ```
//!
//! The executor:
//! 1. Creates a private scratch directory for the execution
//! 2. Spawns the test command in its own process group
//! 3. Races completion against the timeout and run cancellation
//! 4. Kills whatever is left of the process group, on every path
//!
//! # Example
//!
//! ```ignore
//! use suite_runner::runner::{CaseExecutor, CancelToken, TestExecutor};
//!
//! let executor = TestExecutor::new();
//! let result = executor.execute(&case, Duration::from_secs(60), &CancelToken::never()).await;
//! println!("{}: {}", result.test_id, result.status);
//! ```

pub mod cancel;
pub mod config;
pub mod executor;
pub mod process;
pub mod result;
pub mod sandbox;

pub use cancel::{CancelHandle, CancelToken};
pub use config::{RunConfig, DEFAULT_TIMEOUT};
pub use executor::{classify, CaseExecutor, TestExecutor};
pub use process::ChildGuard;
pub use result::{TestResult, TestStatus, MAX_CAPTURED_OUTPUT};
pub use sandbox::Sandbox;
