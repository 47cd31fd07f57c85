//! Language mappings and their bindings.
//!
//! A mapping is one language binding of the library under test ("cpp",
//! "java", ...). Each mapping has a kind, and each kind knows how to:
//! 1. Recognise a test directory in its test tree
//! 2. Turn a test identifier into an invocable command
//! 3. Provide the runtime search paths its test programs need

pub mod cpp;
pub mod java;
pub mod registry;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use cpp::CppBinding;
pub use java::JavaBinding;
pub use registry::MappingRegistry;

/// Default name of the test directory below a mapping root.
pub const DEFAULT_TEST_DIR: &str = "test";

/// Supported language kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Native C++ test programs.
    Cpp,
    /// Java test classes launched through a JVM.
    Java,
}

impl MappingKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            MappingKind::Cpp => "cpp",
            MappingKind::Java => "java",
        }
    }

    /// Returns the binding implementing this kind.
    pub fn binding(&self) -> &'static dyn LanguageBinding {
        match self {
            MappingKind::Cpp => &CppBinding,
            MappingKind::Java => &JavaBinding,
        }
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for MappingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpp" | "c++" => Ok(MappingKind::Cpp),
            "java" => Ok(MappingKind::Java),
            other => Err(format!("Unknown mapping kind: {}", other)),
        }
    }
}

/// A command ready to be spawned for one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl TestCommand {
    /// Creates a command without arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for TestCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Per-language behaviour of a mapping.
pub trait LanguageBinding: Send + Sync {
    /// Returns the kind this binding implements.
    fn kind(&self) -> MappingKind;

    /// File whose presence marks a directory as a test case.
    fn entry_point(&self) -> &'static str;

    /// Builds the command running the test `id` located in `test_dir`.
    fn command(&self, mapping: &Mapping, test_dir: &Path, id: &str) -> TestCommand;

    /// Environment variables every test of the mapping needs.
    fn environment(&self, mapping: &Mapping) -> Vec<(String, String)>;

    /// Returns true if `dir` holds a test case.
    fn is_test_dir(&self, dir: &Path) -> bool {
        dir.join(self.entry_point()).is_file()
    }
}

/// Descriptor of one language mapping.
///
/// Immutable once registered; shared through the registry as `Arc<Mapping>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    name: String,
    kind: MappingKind,
    root: PathBuf,
    test_dir: String,
    launcher: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
}

impl Mapping {
    /// Creates a mapping rooted at `root`.
    /// A relative `root` is anchored at the current directory.
    pub fn new(name: impl Into<String>, kind: MappingKind, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            name: name.into(),
            kind,
            root,
            test_dir: DEFAULT_TEST_DIR.to_string(),
            launcher: None,
            env_vars: Vec::new(),
        }
    }

    /// Sets the test directory name below the root.
    pub fn with_test_dir(mut self, dir: impl Into<String>) -> Self {
        self.test_dir = dir.into();
        self
    }

    /// Sets the runtime launcher (e.g. the `java` executable).
    pub fn with_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    /// Adds a fixed environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn launcher(&self) -> Option<&Path> {
        self.launcher.as_deref()
    }

    /// Directory holding the mapping's tests.
    pub fn test_root(&self) -> PathBuf {
        self.root.join(&self.test_dir)
    }

    /// Directory holding the mapping's built libraries.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn binding(&self) -> &'static dyn LanguageBinding {
        self.kind.binding()
    }

    /// Full environment of a test: binding requirements, then fixed variables.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = self.binding().environment(self);
        env.extend(self.env_vars.iter().cloned());
        env
    }
}

/// Builds `var=<dir><sep><current value>` for a search-path variable.
pub(crate) fn prepend_search_path(var: &str, dir: &Path) -> (String, String) {
    let joined = join_search_path(dir, std::env::var_os(var).as_deref());
    (var.to_string(), joined.to_string_lossy().to_string())
}

/// `dir` followed by the non-empty entries of `current`. An empty entry
/// means the working directory to the dynamic loader.
fn join_search_path(dir: &Path, current: Option<&OsStr>) -> OsString {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(current) = current {
        paths.extend(std::env::split_paths(current).filter(|p| !p.as_os_str().is_empty()));
    }
    std::env::join_paths(paths).unwrap_or_else(|_| OsString::from(dir.as_os_str()))
}
