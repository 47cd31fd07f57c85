//! Command-line interface for suite-runner.
//!
//! Parses the invocation, builds the registry and run configuration and
//! prints the final summary.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
