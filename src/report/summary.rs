//! Human-readable summary and exit code of a run.

use std::fmt::Write as _;

use super::RunReport;
use crate::runner::{TestResult, TestStatus};

/// Number of trailing output lines shown per failing test.
pub const OUTPUT_EXCERPT_LINES: usize = 20;

/// Outcome of summarizing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Text printed at the end of a run.
    pub text: String,
    /// 0 when every result passed or was skipped and no discovery failed.
    pub exit_code: i32,
}

/// Summarizes `report` into printable text and a process exit code.
pub fn summarize(report: &RunReport) -> Summary {
    let mut text = String::new();

    let _ = writeln!(text, "=== Test Results ===");
    let _ = writeln!(text, "Run id:     {}", report.run_id);
    let _ = writeln!(text, "Total:      {}", report.total());
    let _ = writeln!(text, "Passed:     {}", report.count(TestStatus::Passed));
    let _ = writeln!(text, "Failed:     {}", report.count(TestStatus::Failed));
    let _ = writeln!(text, "Timed out:  {}", report.count(TestStatus::TimedOut));
    let _ = writeln!(text, "Errored:    {}", report.count(TestStatus::Errored));
    let _ = writeln!(text, "Skipped:    {}", report.count(TestStatus::Skipped));
    if let Some(finished) = report.finished_at {
        let elapsed = (finished - report.started_at).num_milliseconds() as f64 / 1000.0;
        let _ = writeln!(text, "Duration:   {:.1}s", elapsed);
    }
    if report.cancelled {
        let _ = writeln!(text, "Run was cancelled");
    }

    let discovery: Vec<_> = report.discovery_failures().collect();
    if !discovery.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Discovery failures:");
        for (mapping, error) in &discovery {
            let _ = writeln!(text, "  [{}] {}", mapping, error);
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Failing tests:");
        for result in &failures {
            write_failure(&mut text, result);
        }
    }

    let exit_code = if discovery.is_empty() && failures.is_empty() {
        0
    } else {
        1
    };

    Summary { text, exit_code }
}

fn write_failure(text: &mut String, result: &TestResult) {
    let _ = write!(text, "  [{}] {}: {}", result.mapping, result.test_id, result.status);
    if result.attempts > 1 {
        let _ = write!(text, " after {} attempts", result.attempts);
    }
    if let Some(message) = &result.message {
        let _ = write!(text, " ({})", message);
    }
    let _ = writeln!(text);

    for (label, output) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
        if output.trim().is_empty() {
            continue;
        }
        let _ = writeln!(text, "    --- {} ---", label);
        for line in excerpt(output, OUTPUT_EXCERPT_LINES) {
            let _ = writeln!(text, "    {}", line);
        }
    }
}

/// Last `max_lines` lines of `output`, preceded by an elision marker if cut.
fn excerpt(output: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        return lines.into_iter().map(str::to_string).collect();
    }
    let skipped = lines.len() - max_lines;
    std::iter::once(format!("... ({} lines omitted)", skipped))
        .chain(lines[skipped..].iter().map(|l| l.to_string()))
        .collect()
}
