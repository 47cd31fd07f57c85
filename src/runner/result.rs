//! Outcome of a single test case execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::TestCase;

/// Maximum bytes of each captured stream kept in a result.
pub const MAX_CAPTURED_OUTPUT: usize = 1024 * 1024;

/// Final status of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Test behaved as expected.
    Passed,
    /// Test ran to completion and reported a failure.
    Failed,
    /// Test exceeded its timeout and was killed.
    TimedOut,
    /// Test was not run (filtered out or missing capability).
    Skipped,
    /// Test could not be run properly (spawn failure, bad config, cancelled).
    Errored,
}

impl TestStatus {
    /// Passed and Skipped count as success for the run's exit code.
    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Skipped)
    }

    /// Infrastructure-level outcomes that may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TestStatus::TimedOut | TestStatus::Errored)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "passed"),
            TestStatus::Failed => write!(f, "failed"),
            TestStatus::TimedOut => write!(f, "timed out"),
            TestStatus::Skipped => write!(f, "skipped"),
            TestStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Result of one test case, created once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Owning mapping name.
    pub mapping: String,
    /// Test identifier.
    pub test_id: String,
    /// Final status.
    pub status: TestStatus,
    /// Exit code of the test process, if it exited normally.
    pub exit_code: Option<i32>,
    /// Signal that terminated the process (unix).
    pub signal: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock duration of the final attempt.
    pub duration: Duration,
    /// Number of executions, retries included.
    pub attempts: u32,
    /// Diagnostic message for non-passing outcomes.
    pub message: Option<String>,
}

impl TestResult {
    /// Creates a result for `case` with the given status.
    pub fn new(case: &TestCase, status: TestStatus) -> Self {
        Self {
            mapping: case.mapping.clone(),
            test_id: case.id.clone(),
            status,
            exit_code: None,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            attempts: 0,
            message: None,
        }
    }

    /// Creates a skipped result.
    pub fn skipped(case: &TestCase, reason: impl Into<String>) -> Self {
        Self::new(case, TestStatus::Skipped).with_message(reason)
    }

    /// Creates an errored result.
    pub fn errored(case: &TestCase, error: impl Into<String>) -> Self {
        Self::new(case, TestStatus::Errored).with_message(error)
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_signal(mut self, signal: Option<i32>) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Converts captured bytes to text, marking output that was cut short.
pub fn output_to_string(bytes: &[u8], truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(bytes).to_string();
    if truncated {
        text.push_str("\n... [truncated]");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::CaseConfig;
    use crate::mapping::TestCommand;
    use std::path::PathBuf;

    fn sample_case() -> TestCase {
        TestCase {
            mapping: "cpp".to_string(),
            id: "core/echo".to_string(),
            dir: PathBuf::from("/t/core/echo"),
            command: TestCommand::new("/t/core/echo/client"),
            env: Vec::new(),
            config: CaseConfig::default(),
            config_error: None,
        }
    }

    #[test]
    fn test_status_success_and_retry_classes() {
        assert!(TestStatus::Passed.is_success());
        assert!(TestStatus::Skipped.is_success());
        assert!(!TestStatus::Failed.is_success());
        assert!(!TestStatus::TimedOut.is_success());
        assert!(!TestStatus::Errored.is_success());

        assert!(TestStatus::TimedOut.is_retryable());
        assert!(TestStatus::Errored.is_retryable());
        assert!(!TestStatus::Failed.is_retryable());
        assert!(!TestStatus::Passed.is_retryable());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TestStatus::TimedOut.to_string(), "timed out");
        assert_eq!(TestStatus::Passed.to_string(), "passed");
    }

    #[test]
    fn test_result_builders() {
        let result = TestResult::new(&sample_case(), TestStatus::Failed)
            .with_exit_code(Some(3))
            .with_stderr("boom")
            .with_attempts(1);
        assert_eq!(result.mapping, "cpp");
        assert_eq!(result.test_id, "core/echo");
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr, "boom");
        assert!(!result.is_success());

        let skipped = TestResult::skipped(&sample_case(), "filtered");
        assert_eq!(skipped.status, TestStatus::Skipped);
        assert_eq!(skipped.message.as_deref(), Some("filtered"));
    }

    #[test]
    fn test_output_to_string() {
        assert_eq!(output_to_string(b"abc", false), "abc");
        assert!(output_to_string(b"abc", true).ends_with("[truncated]"));
    }
}
