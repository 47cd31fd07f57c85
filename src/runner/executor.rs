//! Test executor - runs one test case as an isolated subprocess.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::config::RunConfig;
use super::process::{exit_signal, isolate, ChildGuard};
use super::result::{output_to_string, TestResult, TestStatus, MAX_CAPTURED_OUTPUT};
use super::sandbox::Sandbox;
use crate::discovery::TestCase;
use crate::error::ExecutorError;

/// How long captured streams may keep draining after the process is gone.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Executes a single test case.
#[async_trait]
pub trait CaseExecutor: Send + Sync {
    /// Runs `case` once, bounded by `timeout`, and reports its outcome.
    async fn execute(&self, case: &TestCase, timeout: Duration, cancel: &CancelToken) -> TestResult;
}

/// Executor spawning test commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct TestExecutor {
    /// Parent of per-execution sandboxes.
    scratch_root: Option<std::path::PathBuf>,
    /// Variables added to every test environment.
    env_vars: Vec<(String, String)>,
}

impl TestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor honouring the run's scratch root and environment.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            scratch_root: config.scratch_root.clone(),
            env_vars: config.env_vars.clone(),
        }
    }

    fn build_command(&self, case: &TestCase, sandbox: &Sandbox) -> Command {
        let mut cmd = Command::new(&case.command.program);
        cmd.args(&case.command.args)
            .current_dir(sandbox.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &case.env {
            cmd.env(key, value);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        for (key, value) in sandbox.environment(&case.dir) {
            cmd.env(key, value);
        }

        isolate(&mut cmd);
        cmd
    }

    /// Creates the sandbox and spawns the test inside it.
    fn launch(&self, case: &TestCase) -> Result<(Sandbox, Child), ExecutorError> {
        let sandbox =
            Sandbox::create(self.scratch_root.as_deref(), &case.id).map_err(ExecutorError::Sandbox)?;

        debug!(mapping = %case.mapping, test = %case.id, command = %case.command, "Spawning test");
        match self.build_command(case, &sandbox).spawn() {
            Ok(child) => Ok((sandbox, child)),
            Err(source) => {
                sandbox.cleanup();
                Err(ExecutorError::Spawn {
                    program: case.command.program.clone(),
                    source,
                })
            }
        }
    }
}

/// What ended the wait on the child.
enum Completion {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl CaseExecutor for TestExecutor {
    async fn execute(&self, case: &TestCase, timeout: Duration, cancel: &CancelToken) -> TestResult {
        let start = Instant::now();

        let (sandbox, child) = match self.launch(case) {
            Ok(launched) => launched,
            Err(e) => {
                return TestResult::errored(case, e.to_string()).with_duration(start.elapsed());
            }
        };

        let mut guard = ChildGuard::new(child);
        let stdout = spawn_capture(guard.child_mut().stdout.take());
        let stderr = spawn_capture(guard.child_mut().stderr.take());

        let mut cancel = cancel.clone();
        let completion = tokio::select! {
            status = guard.wait() => Completion::Exited(status),
            _ = tokio::time::sleep(timeout) => Completion::TimedOut,
            _ = cancel.cancelled() => Completion::Cancelled,
        };

        // Helpers left behind by the test die with its group on every path.
        guard.terminate().await;
        drop(guard);

        let duration = start.elapsed();
        let (stdout, stdout_truncated) = collect_capture(stdout).await;
        let (stderr, stderr_truncated) = collect_capture(stderr).await;
        sandbox.cleanup();

        let result = match completion {
            Completion::Exited(Ok(status)) => {
                let (test_status, message) = classify(status.success(), case.is_expected_failure());
                let mut result = TestResult::new(case, test_status)
                    .with_exit_code(status.code())
                    .with_signal(exit_signal(&status));
                if let Some(message) = message {
                    result = result.with_message(message);
                } else if test_status == TestStatus::Failed {
                    result = result.with_message(describe_exit(&status));
                }
                result
            }
            Completion::Exited(Err(e)) => TestResult::errored(case, ExecutorError::Wait(e).to_string()),
            Completion::TimedOut => TestResult::new(case, TestStatus::TimedOut)
                .with_message(format!("Timed out after {:?}", timeout)),
            Completion::Cancelled => TestResult::errored(case, "cancelled"),
        };

        let result = result
            .with_stdout(output_to_string(&stdout, stdout_truncated))
            .with_stderr(output_to_string(&stderr, stderr_truncated))
            .with_duration(duration);

        match result.status {
            TestStatus::Passed => info!(
                mapping = %case.mapping,
                test = %case.id,
                duration_ms = duration.as_millis() as u64,
                "Test passed"
            ),
            status => warn!(
                mapping = %case.mapping,
                test = %case.id,
                %status,
                exit_code = ?result.exit_code,
                duration_ms = duration.as_millis() as u64,
                "Test did not pass"
            ),
        }

        result
    }
}

/// Maps a normal exit onto a status, honouring expected-failure inversion.
pub fn classify(success: bool, expected_failure: bool) -> (TestStatus, Option<String>) {
    match (success, expected_failure) {
        (true, false) => (TestStatus::Passed, None),
        (false, false) => (TestStatus::Failed, None),
        (false, true) => (TestStatus::Passed, Some("failed as expected".to_string())),
        (true, true) => (
            TestStatus::Failed,
            Some("unexpected success of a test marked expected_failure".to_string()),
        ),
    }
}

fn describe_exit(status: &ExitStatus) -> String {
    match (status.code(), exit_signal(status)) {
        (Some(code), _) => format!("exited with code {}", code),
        (None, Some(signal)) => format!("killed by signal {}", signal),
        (None, None) => "exited abnormally".to_string(),
    }
}

fn spawn_capture<R>(reader: Option<R>) -> JoinHandle<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match reader {
            Some(reader) => read_capped(reader, MAX_CAPTURED_OUTPUT).await,
            None => (Vec::new(), false),
        }
    })
}

async fn collect_capture(handle: JoinHandle<(Vec<u8>, bool)>) -> (Vec<u8>, bool) {
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, handle).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(e)) => {
            warn!(error = %e, "Output capture task failed");
            (Vec::new(), false)
        }
        Err(_) => {
            warn!("Output capture did not finish after the process exited");
            (Vec::new(), false)
        }
    }
}

/// Reads until EOF, keeping at most `limit` bytes; the rest is drained.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> (Vec<u8>, bool) {
    let mut captured = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(captured.len());
                if n > room {
                    truncated = true;
                }
                captured.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!(error = %e, "Stopped reading test output");
                break;
            }
        }
    }

    (captured, truncated)
}
