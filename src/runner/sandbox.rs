//! Per-invocation scratch space for test processes.
//!
//! Every execution gets its own directory so concurrent tests never share
//! temporary files, sockets or working directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Environment variable pointing at the scratch directory.
pub const SCRATCH_DIR_VAR: &str = "TEST_SCRATCH_DIR";

/// Environment variable pointing at the test's own directory.
pub const SOURCE_DIR_VAR: &str = "TEST_SOURCE_DIR";

/// Scratch directory owned by one test execution.
pub struct Sandbox {
    /// Unique identifier for this sandbox.
    pub id: String,
    dir: TempDir,
}

impl Sandbox {
    /// Creates a fresh directory below `root` (system temp dir if `None`).
    pub fn create(root: Option<&Path>, label: &str) -> std::io::Result<Self> {
        let id = format!("suite-{}-{}", sanitize(label), Uuid::new_v4().simple());

        let mut builder = tempfile::Builder::new();
        builder.prefix(&id);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        debug!(sandbox = %id, path = %dir.path().display(), "Created sandbox");
        Ok(Self { id, dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Variables exported to the test process.
    pub fn environment(&self, source_dir: &Path) -> Vec<(String, PathBuf)> {
        vec![
            (SCRATCH_DIR_VAR.to_string(), self.path().to_path_buf()),
            ("TMPDIR".to_string(), self.path().to_path_buf()),
            (SOURCE_DIR_VAR.to_string(), source_dir.to_path_buf()),
        ]
    }

    /// Removes the directory, logging failures instead of returning them.
    pub fn cleanup(self) {
        let id = self.id;
        if let Err(e) = self.dir.close() {
            warn!(sandbox = %id, error = %e, "Failed to remove sandbox");
        }
    }
}

/// Keeps identifier characters that are safe in a file name.
fn sanitize(label: &str) -> String {
    let safe: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(48)
        .collect();
    if safe.is_empty() {
        "test".to_string()
    } else {
        safe
    }
}
