//! Scoped ownership of a test process and its process group.
//!
//! Test programs routinely start helpers (servers, brokers). Each test is
//! spawned as the leader of a new process group and the whole group is
//! killed when the guard is terminated or dropped, whatever path the
//! execution took.

use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tracing::debug;

/// Puts the command's child in its own process group.
pub fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
    cmd.kill_on_drop(true);
}

/// Owns a spawned child; kills its process group on termination or drop.
pub struct ChildGuard {
    child: Child,
    pgid: Option<u32>,
}

impl ChildGuard {
    /// Takes ownership of a child spawned with [`isolate`].
    pub fn new(child: Child) -> Self {
        let pgid = child.id();
        Self { child, pgid }
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Waits for the group leader to exit.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kills the whole group, then reaps the leader.
    pub async fn terminate(&mut self) {
        self.kill_group();
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    fn kill_group(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // ESRCH just means every member already exited.
            let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            debug!(pgid, rc, "Killed process group");
        }
        #[cfg(not(unix))]
        {
            debug!(pid = pgid, "Killing child process");
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill_group();
        let _ = self.child.start_kill();
    }
}

/// Exit signal of a status, on platforms that have signals.
pub fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}
