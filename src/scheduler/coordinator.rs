//! Run coordinator.
//!
//! Resolves the requested mappings, discovers their tests and drives the
//! executor over them on a bounded worker pool. Results are recorded in
//! discovery order regardless of completion order.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use super::ordered::OrderedBuffer;
use super::retry::RetryPolicy;
use super::worker_pool::WorkerPool;
use crate::discovery::{discover_off_thread, TestCase, TestFilter};
use crate::error::RunError;
use crate::mapping::{Mapping, MappingRegistry};
use crate::report::{MappingReport, RunReport};
use crate::runner::{CancelToken, CaseExecutor, RunConfig, TestResult};

/// Message of results for cases never started because the run was cancelled.
pub const CANCELLED_BEFORE_START: &str = "run cancelled";

/// Drives one run over a set of mappings.
pub struct RunCoordinator<'r> {
    registry: &'r MappingRegistry,
    executor: Arc<dyn CaseExecutor>,
    config: RunConfig,
    retry: RetryPolicy,
    cancel: CancelToken,
}

impl<'r> RunCoordinator<'r> {
    /// Creates a coordinator; the retry policy follows `config.retries`.
    pub fn new(registry: &'r MappingRegistry, executor: Arc<dyn CaseExecutor>, config: RunConfig) -> Self {
        let retry = RetryPolicy::new(config.retries);
        Self {
            registry,
            executor,
            config,
            retry,
            cancel: CancelToken::never(),
        }
    }

    /// Observes `cancel` for cancellation requests.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the tests of `names`, in that order.
    ///
    /// A name given more than once runs once, at its first position.
    ///
    /// # Errors
    ///
    /// Fails before any test starts if a name is not registered or if no
    /// names are given. Discovery failures are recorded in the report.
    pub async fn run<S: AsRef<str>>(
        &self,
        names: &[S],
        filter: Option<&TestFilter>,
    ) -> Result<RunReport, RunError> {
        if names.is_empty() {
            return Err(RunError::NoMappings);
        }
        let mut mappings = self.registry.resolve_all(names)?;
        let mut seen = HashSet::new();
        mappings.retain(|m| {
            let first = seen.insert(m.name().to_string());
            if !first {
                warn!(mapping = %m.name(), "Mapping requested more than once, running it once");
            }
            first
        });

        let mut report = RunReport::new();
        info!(
            run_id = %report.run_id,
            mappings = ?mappings.iter().map(|m| m.name()).collect::<Vec<_>>(),
            workers = self.config.workers,
            retries = self.config.retries,
            "Starting run"
        );

        for mapping in mappings {
            let mapping_report = self.run_mapping(mapping, filter).await;
            report.push(mapping_report);
        }

        report.cancelled = self.cancel.is_cancelled();
        report.finish();

        info!(
            run_id = %report.run_id,
            total = report.total(),
            success = report.is_success(),
            cancelled = report.cancelled,
            "Run finished"
        );
        Ok(report)
    }

    /// Discovers and runs the tests of one mapping.
    pub async fn run_mapping(&self, mapping: Arc<Mapping>, filter: Option<&TestFilter>) -> MappingReport {
        let name = mapping.name().to_string();

        let cases = match discover_off_thread(mapping).await {
            Ok(cases) => cases,
            Err(e) => {
                warn!(mapping = %name, error = %e, "Discovery failed, skipping mapping");
                return MappingReport::discovery_failed(name, e.to_string());
            }
        };

        let pool = WorkerPool::new(self.config.workers);
        let pool_ref = &pool;
        let mut pending: FuturesUnordered<_> = cases
            .iter()
            .enumerate()
            .map(|(index, case)| async move { (index, self.run_case(pool_ref, case, filter).await) })
            .collect();

        let mut buffer = OrderedBuffer::new();
        let mut results = Vec::with_capacity(cases.len());
        while let Some((index, result)) = pending.next().await {
            for result in buffer.push(index, result) {
                debug!(
                    mapping = %name,
                    test = %result.test_id,
                    status = %result.status,
                    attempts = result.attempts,
                    "Recorded result"
                );
                results.push(result);
            }
        }
        drop(pending);

        let stats = pool.stats();
        debug!(
            mapping = %name,
            executions = stats.executions,
            peak_workers = stats.peak_active_workers,
            "Mapping finished"
        );

        MappingReport::new(name).with_results(results)
    }

    /// Produces the result of one case: skipped, errored or executed.
    async fn run_case(&self, pool: &WorkerPool, case: &TestCase, filter: Option<&TestFilter>) -> TestResult {
        if let Some(filter) = filter {
            if !filter.matches(case) {
                return TestResult::skipped(case, "filtered");
            }
        }

        let missing = case.missing_capabilities(&self.config.capabilities);
        if !missing.is_empty() {
            debug!(mapping = %case.mapping, test = %case.id, missing = ?missing, "Skipping test");
            return TestResult::skipped(case, format!("missing capability {}", missing.join(", ")));
        }

        if let Some(error) = &case.config_error {
            return TestResult::errored(case, error.clone());
        }

        if self.cancel.is_cancelled() {
            return TestResult::errored(case, CANCELLED_BEFORE_START);
        }

        let mut cancel = self.cancel.clone();
        let _slot = tokio::select! {
            slot = pool.acquire() => match slot {
                Ok(slot) => slot,
                Err(e) => return TestResult::errored(case, e.to_string()),
            },
            _ = cancel.cancelled() => return TestResult::errored(case, CANCELLED_BEFORE_START),
        };

        if self.cancel.is_cancelled() {
            return TestResult::errored(case, CANCELLED_BEFORE_START);
        }

        self.run_with_retries(case).await
    }

    /// Executes `case` until it produces a final result or runs out of attempts.
    async fn run_with_retries(&self, case: &TestCase) -> TestResult {
        let timeout = case.config.timeout().unwrap_or(self.config.timeout);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(mapping = %case.mapping, test = %case.id, attempt = attempts, "Starting test");

            let result = self
                .executor
                .execute(case, timeout, &self.cancel)
                .await
                .with_attempts(attempts);

            if self.cancel.is_cancelled() || !self.retry.should_retry(&result, attempts) {
                return result;
            }

            warn!(
                mapping = %case.mapping,
                test = %case.id,
                attempt = attempts,
                status = %result.status,
                remaining_attempts = self.retry.remaining_attempts(attempts),
                "Test did not complete, retrying"
            );
        }
    }
}
