//! CLI definition and command implementation for suite-runner.
//!
//! A single command: resolve the requested mappings, run (or list) their
//! tests, print a summary and return the process exit code.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::config::SuiteConfig;
use crate::discovery::{discover_off_thread, TestFilter};
use crate::mapping::MappingRegistry;
use crate::report::summarize;
use crate::runner::{CancelHandle, RunConfig, TestExecutor};
use crate::scheduler::RunCoordinator;

/// Environment variable naming the default configuration file.
const CONFIG_ENV: &str = "SUITE_RUNNER_CONFIG";

/// Runs the test suites of several language mappings.
#[derive(Parser, Debug)]
#[command(name = "suite-runner")]
#[command(about = "Run the test suites of several language mappings and report the results")]
#[command(version)]
#[command(
    long_about = "suite-runner discovers prebuilt test programs of each language mapping, runs them as isolated processes and prints a unified report.\n\nExample usage:\n  suite-runner cpp java --workers 4 --filter '^Ice/' --export-json report.json"
)]
pub struct Cli {
    /// Mappings to run, in order. Defaults to every configured mapping.
    #[arg(value_name = "MAPPING")]
    pub mappings: Vec<String>,

    /// Suite configuration file (YAML).
    #[arg(short, long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Only run tests whose identifier matches this regex (repeatable).
    #[arg(long = "filter", value_name = "REGEX")]
    pub filters: Vec<String>,

    /// Skip tests whose identifier matches this regex (repeatable).
    #[arg(long = "rfilter", value_name = "REGEX")]
    pub reject_filters: Vec<String>,

    /// Only run tests carrying this tag (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Number of tests executed concurrently.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-test timeout in seconds, for tests without their own.
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Extra attempts for timed-out or errored tests.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Capability available in this environment (repeatable).
    #[arg(long = "capability", value_name = "NAME")]
    pub capabilities: Vec<String>,

    /// Write the full report as JSON to this file.
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// List discovered tests without running them.
    #[arg(long)]
    pub list: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<i32> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments and return the process exit code.
///
/// Installs the mapping registry described by the configuration as the
/// process-wide registry before anything runs.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<i32> {
    let suite = load_suite_config(&cli)?;
    let registry = suite
        .to_registry()
        .context("Failed to build mapping registry")?
        .install()?;

    execute(&cli, &suite, registry).await
}

fn load_suite_config(cli: &Cli) -> anyhow::Result<SuiteConfig> {
    match &cli.config {
        Some(path) => Ok(SuiteConfig::load(path)?),
        None => Ok(SuiteConfig::builtin(std::env::current_dir()?)),
    }
}

/// Builds the run configuration: file defaults first, then CLI overrides.
fn run_config(cli: &Cli, suite: &SuiteConfig) -> RunConfig {
    let mut config = suite.apply_run_defaults(RunConfig::new());
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = cli.retries {
        config = config.with_retries(retries);
    }
    for capability in &cli.capabilities {
        config = config.with_capability(capability.clone());
    }
    config
}

/// Requested mapping names, or every registered mapping.
fn mapping_names(cli: &Cli, registry: &MappingRegistry) -> Vec<String> {
    if cli.mappings.is_empty() {
        registry.names()
    } else {
        cli.mappings.clone()
    }
}

async fn execute(cli: &Cli, suite: &SuiteConfig, registry: &MappingRegistry) -> anyhow::Result<i32> {
    let names = mapping_names(cli, registry);
    let filter = TestFilter::from_patterns(&cli.filters, &cli.reject_filters, &cli.tags)
        .context("Invalid test filter")?;
    let filter = (!filter.is_empty()).then_some(filter);

    if cli.list {
        return list_tests(&names, filter.as_ref(), registry).await;
    }

    let config = run_config(cli, suite);
    let executor = Arc::new(TestExecutor::from_config(&config));

    let cancel = CancelHandle::new();
    let signal_handle = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            signal_handle.cancel();
        }
    });

    let coordinator = RunCoordinator::new(registry, executor, config).with_cancel(cancel.token());
    let outcome = coordinator.run(&names, filter.as_ref()).await;
    ctrl_c.abort();
    let report = outcome?;

    if let Some(path) = &cli.export_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Exported report");
    }

    let summary = summarize(&report);
    println!("{}", summary.text);
    Ok(summary.exit_code)
}

/// Prints the identifiers the run would consider, per mapping.
async fn list_tests(
    names: &[String],
    filter: Option<&TestFilter>,
    registry: &MappingRegistry,
) -> anyhow::Result<i32> {
    let mappings = registry.resolve_all(names)?;
    let mut exit_code = 0;

    for mapping in mappings {
        println!("{}:", mapping.name());
        match discover_off_thread(mapping).await {
            Ok(cases) => {
                for case in cases.iter().filter(|c| filter.map_or(true, |f| f.matches(c))) {
                    println!("  {}", case.id);
                }
            }
            Err(e) => {
                println!("  discovery failed: {}", e);
                exit_code = 1;
            }
        }
    }
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["suite-runner"]).unwrap();
        assert!(cli.mappings.is_empty());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.list);
        assert!(cli.workers.is_none());
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "suite-runner",
            "cpp",
            "java",
            "--filter",
            "^Ice/",
            "--filter",
            "^IceSSL/",
            "--rfilter",
            "slow",
            "--tag",
            "smoke",
            "-w",
            "4",
            "--timeout",
            "60",
            "--retries",
            "2",
            "--capability",
            "ssl",
            "--export-json",
            "out.json",
        ])
        .unwrap();

        assert_eq!(cli.mappings, vec!["cpp", "java"]);
        assert_eq!(cli.filters.len(), 2);
        assert_eq!(cli.reject_filters, vec!["slow"]);
        assert_eq!(cli.tags, vec!["smoke"]);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.timeout, Some(60));
        assert_eq!(cli.retries, Some(2));
        assert_eq!(cli.export_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Cli::try_parse_from(["suite-runner", "--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["suite-runner", "-t", "1"]).is_ok());
    }

    #[test]
    fn test_cli_overrides_file_defaults() {
        let suite = SuiteConfig::from_yaml_str(
            "run:\n  workers: 2\n  timeout_secs: 30\n  capabilities: [ipv6]\n",
            std::path::Path::new("/x"),
        )
        .unwrap();
        let cli = Cli::try_parse_from(["suite-runner", "-w", "8", "--capability", "ssl"]).unwrap();

        let config = run_config(&cli, &suite);
        assert_eq!(config.workers, 8);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.capabilities.contains("ssl"));
        assert!(config.capabilities.contains("ipv6"));
    }

    #[test]
    fn test_mapping_names_default_to_registry_order() {
        let registry = MappingRegistry::with_defaults(std::path::Path::new("/src"));
        let cli = Cli::try_parse_from(["suite-runner"]).unwrap();
        assert_eq!(mapping_names(&cli, &registry), vec!["cpp", "java"]);

        let cli = Cli::try_parse_from(["suite-runner", "java"]).unwrap();
        assert_eq!(mapping_names(&cli, &registry), vec!["java"]);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_an_error() {
        let registry = MappingRegistry::with_defaults(std::path::Path::new("/src"));
        let cli = Cli::try_parse_from(["suite-runner", "--filter", "("]).unwrap();
        let result = execute(&cli, &SuiteConfig::default(), &registry).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_reports_discovery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MappingRegistry::with_defaults(dir.path());
        let cli = Cli::try_parse_from(["suite-runner", "cpp", "--list"]).unwrap();
        let code = execute(&cli, &SuiteConfig::default(), &registry).await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_list_does_not_run_tests() {
        let dir = tempfile::tempdir().unwrap();
        let test_dir = dir.path().join("cpp/test/core/echo");
        std::fs::create_dir_all(&test_dir).unwrap();
        let marker = dir.path().join("ran");
        std::fs::write(
            test_dir.join(crate::mapping::cpp::CLIENT_EXE),
            format!("#!/bin/sh
touch {}
", marker.display()),
        )
        .unwrap();

        let registry = MappingRegistry::with_defaults(dir.path());
        let cli = Cli::try_parse_from(["suite-runner", "cpp", "--list"]).unwrap();
        let code = execute(&cli, &SuiteConfig::default(), &registry).await.unwrap();
        assert_eq!(code, 0);
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_runs_and_exports() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let test_dir = dir.path().join("cpp/test/core/echo");
        std::fs::create_dir_all(&test_dir).unwrap();
        let client = test_dir.join("client");
        std::fs::write(&client, "#!/bin/sh\necho hello\n").unwrap();
        std::fs::set_permissions(&client, std::fs::Permissions::from_mode(0o755)).unwrap();

        let registry = MappingRegistry::with_defaults(dir.path());
        let export = dir.path().join("report.json");
        let cli = Cli::try_parse_from([
            "suite-runner",
            "cpp",
            "--export-json",
            export.to_str().unwrap(),
        ])
        .unwrap();

        let code = execute(&cli, &SuiteConfig::default(), &registry).await.unwrap();
        assert_eq!(code, 0);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert_eq!(json["mappings"][0]["results"][0]["test_id"], "core/echo");
        assert_eq!(json["mappings"][0]["results"][0]["status"], "passed");
        assert_eq!(json["mappings"][0]["results"][0]["stdout"], "hello\n");
    }
}
