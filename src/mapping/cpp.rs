//! C++ mapping binding.
//!
//! C++ tests are prebuilt native executables named `client` living in the
//! test directory; they need the mapping's `lib` directory on the dynamic
//! loader search path.

use std::path::Path;

use super::{prepend_search_path, LanguageBinding, Mapping, MappingKind, TestCommand};

/// File name of a C++ test executable.
#[cfg(windows)]
pub const CLIENT_EXE: &str = "client.exe";
#[cfg(not(windows))]
pub const CLIENT_EXE: &str = "client";

#[cfg(target_os = "macos")]
const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
const LIBRARY_PATH_VAR: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Binding for native C++ test programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppBinding;

impl LanguageBinding for CppBinding {
    fn kind(&self) -> MappingKind {
        MappingKind::Cpp
    }

    fn entry_point(&self) -> &'static str {
        CLIENT_EXE
    }

    fn command(&self, _mapping: &Mapping, test_dir: &Path, _id: &str) -> TestCommand {
        TestCommand::new(test_dir.join(CLIENT_EXE))
    }

    fn environment(&self, mapping: &Mapping) -> Vec<(String, String)> {
        vec![prepend_search_path(LIBRARY_PATH_VAR, &mapping.lib_dir())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cpp_command_points_at_client() {
        let mapping = Mapping::new("cpp", MappingKind::Cpp, "/src/cpp");
        let cmd = CppBinding.command(&mapping, Path::new("/src/cpp/test/core/echo"), "core/echo");
        assert_eq!(cmd.program, PathBuf::from("/src/cpp/test/core/echo").join(CLIENT_EXE));
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_cpp_environment_has_library_path() {
        let mapping = Mapping::new("cpp", MappingKind::Cpp, "/src/cpp");
        let env = CppBinding.environment(&mapping);
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].0, LIBRARY_PATH_VAR);
        assert!(env[0].1.starts_with(&*PathBuf::from("/src/cpp/lib").to_string_lossy()));
    }

    #[test]
    fn test_cpp_is_test_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!CppBinding.is_test_dir(dir.path()));
        std::fs::write(dir.path().join(CLIENT_EXE), "").unwrap();
        assert!(CppBinding.is_test_dir(dir.path()));
    }
}
