//! Test selection by identifier and tags.

use regex::Regex;

use super::TestCase;

/// Predicate narrowing the discovered tests of a run.
///
/// A case is selected when it matches at least one include pattern (or none
/// are given), matches no reject pattern, and carries every required tag.
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    include: Vec<Regex>,
    reject: Vec<Regex>,
    tags: Vec<String>,
}

impl TestFilter {
    /// Creates a filter that selects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an include pattern matched against the test identifier.
    pub fn include(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.include.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Adds a reject pattern matched against the test identifier.
    pub fn reject(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.reject.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Requires a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Builds a filter from CLI-style pattern lists.
    pub fn from_patterns(
        include: &[String],
        reject: &[String],
        tags: &[String],
    ) -> Result<Self, regex::Error> {
        let mut filter = Self::new();
        for pattern in include {
            filter = filter.include(pattern)?;
        }
        for pattern in reject {
            filter = filter.reject(pattern)?;
        }
        for tag in tags {
            filter = filter.with_tag(tag.clone());
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.reject.is_empty() && self.tags.is_empty()
    }

    /// Returns true if the case is selected.
    pub fn matches(&self, case: &TestCase) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|re| re.is_match(&case.id));
        let rejected = self.reject.iter().any(|re| re.is_match(&case.id));
        let tagged = self.tags.iter().all(|tag| case.has_tag(tag));
        included && !rejected && tagged
    }
}
