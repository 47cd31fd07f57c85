//! Retry policy for test executions.

use serde::{Deserialize, Serialize};

use crate::runner::TestResult;

/// Decides whether a finished execution is run again.
///
/// Only infrastructure-level outcomes (timed out, errored) are retried.
/// A test that ran and failed is a real result and is never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional executions allowed after the first one.
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total number of executions a case may get.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Executions still available after `attempts` were made.
    pub fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts().saturating_sub(attempts)
    }

    /// Returns whether `result`, produced by execution number `attempts`,
    /// should be followed by another execution.
    pub fn should_retry(&self, result: &TestResult, attempts: u32) -> bool {
        result.status.is_retryable() && self.remaining_attempts(attempts) > 0
    }
}
