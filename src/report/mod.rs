//! Aggregated results of a run.
//!
//! A [`RunReport`] holds one [`MappingReport`] per requested mapping, in the
//! order the mappings were requested, and each mapping report holds exactly
//! one [`TestResult`] per discovered test case in discovery order.

pub mod summary;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runner::{TestResult, TestStatus};

pub use summary::{summarize, Summary, OUTPUT_EXCERPT_LINES};

/// Results of one mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingReport {
    /// Mapping name.
    pub mapping: String,
    /// Set when the mapping's tests could not be enumerated.
    pub discovery_error: Option<String>,
    /// One result per discovered test case, in discovery order.
    pub results: Vec<TestResult>,
}

impl MappingReport {
    pub fn new(mapping: impl Into<String>) -> Self {
        Self {
            mapping: mapping.into(),
            discovery_error: None,
            results: Vec::new(),
        }
    }

    /// Creates the report of a mapping whose discovery failed.
    pub fn discovery_failed(mapping: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            mapping: mapping.into(),
            discovery_error: Some(error.into()),
            results: Vec::new(),
        }
    }

    pub fn with_results(mut self, results: Vec<TestResult>) -> Self {
        self.results = results;
        self
    }

    pub fn is_success(&self) -> bool {
        self.discovery_error.is_none() && self.results.iter().all(TestResult::is_success)
    }
}

/// Report of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-mapping reports in request order.
    pub mappings: Vec<MappingReport>,
    /// Whether the run was cancelled before completion.
    pub cancelled: bool,
}

impl RunReport {
    /// Creates an empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            mappings: Vec::new(),
            cancelled: false,
        }
    }

    /// Appends the report of the next mapping.
    pub fn push(&mut self, mapping: MappingReport) {
        self.mappings.push(mapping);
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Looks up the result of one (mapping, test) pair.
    pub fn get(&self, mapping: &str, test_id: &str) -> Option<&TestResult> {
        self.mapping(mapping)?
            .results
            .iter()
            .find(|r| r.test_id == test_id)
    }

    pub fn mapping(&self, name: &str) -> Option<&MappingReport> {
        self.mappings.iter().find(|m| m.mapping == name)
    }

    /// All results in report order.
    pub fn results(&self) -> impl Iterator<Item = &TestResult> {
        self.mappings.iter().flat_map(|m| m.results.iter())
    }

    /// Number of results with the given status.
    pub fn count(&self, status: TestStatus) -> usize {
        self.results().filter(|r| r.status == status).count()
    }

    /// Result count per status, including zero counts.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        [
            TestStatus::Passed,
            TestStatus::Failed,
            TestStatus::TimedOut,
            TestStatus::Skipped,
            TestStatus::Errored,
        ]
        .into_iter()
        .map(|status| (status.to_string(), self.count(status)))
        .collect()
    }

    pub fn total(&self) -> usize {
        self.results().count()
    }

    /// Mappings whose discovery failed, with their error.
    pub fn discovery_failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings
            .iter()
            .filter_map(|m| m.discovery_error.as_deref().map(|e| (m.mapping.as_str(), e)))
    }

    /// Results that make the run unsuccessful.
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results().filter(|r| !r.is_success())
    }

    /// True when every result passed or was skipped and every mapping was discovered.
    pub fn is_success(&self) -> bool {
        self.mappings.iter().all(MappingReport::is_success)
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
