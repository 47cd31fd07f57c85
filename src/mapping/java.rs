//! Java mapping binding.
//!
//! Java tests are compiled `Client` classes whose package mirrors the test
//! identifier (`Ice/operations` -> `Ice.operations.Client`). The test tree is
//! the class root; the jars in the mapping's `lib` directory complete the
//! classpath.

use std::path::{Path, PathBuf};

use super::{LanguageBinding, Mapping, MappingKind, TestCommand};

/// Compiled main class marking a Java test directory.
pub const CLIENT_CLASS: &str = "Client.class";

#[cfg(windows)]
const JAVA_EXE: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_EXE: &str = "java";

/// Binding for Java test classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaBinding;

impl JavaBinding {
    /// Resolves the JVM launcher: configured launcher, `$JAVA_HOME`, then `PATH`.
    pub fn launcher(mapping: &Mapping) -> PathBuf {
        if let Some(launcher) = mapping.launcher() {
            return launcher.to_path_buf();
        }
        match std::env::var_os("JAVA_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join(JAVA_EXE),
            _ => PathBuf::from(JAVA_EXE),
        }
    }

    /// Classpath: the test class root, then every jar of `lib` in name order.
    pub fn classpath(mapping: &Mapping) -> String {
        let mut entries = vec![mapping.test_root()];

        let mut jars: Vec<PathBuf> = std::fs::read_dir(mapping.lib_dir())
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.extension().map(|ext| ext == "jar").unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default();
        jars.sort();
        entries.extend(jars);

        std::env::join_paths(&entries)
            .map(|joined| joined.to_string_lossy().to_string())
            .unwrap_or_else(|_| mapping.test_root().to_string_lossy().to_string())
    }

    /// Fully qualified main class of the test `id`.
    pub fn main_class(id: &str) -> String {
        let package = id.trim_matches('/').replace('/', ".");
        if package.is_empty() {
            "Client".to_string()
        } else {
            format!("{}.Client", package)
        }
    }
}

impl LanguageBinding for JavaBinding {
    fn kind(&self) -> MappingKind {
        MappingKind::Java
    }

    fn entry_point(&self) -> &'static str {
        CLIENT_CLASS
    }

    fn command(&self, mapping: &Mapping, _test_dir: &Path, id: &str) -> TestCommand {
        TestCommand::new(Self::launcher(mapping))
            .arg("-cp")
            .arg(Self::classpath(mapping))
            .arg(Self::main_class(id))
    }

    fn environment(&self, mapping: &Mapping) -> Vec<(String, String)> {
        vec![("CLASSPATH".to_string(), Self::classpath(mapping))]
    }
}
