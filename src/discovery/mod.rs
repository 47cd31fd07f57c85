//! Test discovery.
//!
//! Walks a mapping's test tree and returns its test cases sorted by
//! identifier. Discovery reads the filesystem only; calling it twice on an
//! unchanged tree yields the same sequence.

pub mod case;
pub mod filter;

use std::path::{Component, Path};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::DiscoveryError;
use crate::mapping::Mapping;

pub use case::{CaseConfig, TestCase, CASE_CONFIG_FILE};
pub use filter::TestFilter;

/// Enumerates the test cases of `mapping`, sorted by identifier.
///
/// # Errors
///
/// Returns `DiscoveryError` if the test root is missing or unreadable, or if
/// part of the tree cannot be walked.
pub fn discover(mapping: &Mapping) -> Result<Vec<TestCase>, DiscoveryError> {
    let root = mapping.test_root();
    check_root(mapping, &root)?;

    let binding = mapping.binding();
    let env = mapping.environment();
    let mut cases = Vec::new();

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                warn!(mapping = %mapping.name(), error = %e, "Skipping symlink loop");
                continue;
            }
            Err(e) => {
                return Err(DiscoveryError::Walk {
                    mapping: mapping.name().to_string(),
                    message: e.to_string(),
                })
            }
        };

        if !entry.file_type().is_dir() || !binding.is_test_dir(entry.path()) {
            continue;
        }

        let Some(id) = identifier(&root, entry.path()) else {
            warn!(path = %entry.path().display(), "Skipping test with non UTF-8 path");
            continue;
        };

        let (config, config_error) = match CaseConfig::load(entry.path()) {
            Ok(config) => (config, None),
            Err(e) => {
                warn!(mapping = %mapping.name(), test = %id, error = %e, "Bad test configuration");
                (CaseConfig::default(), Some(e))
            }
        };

        let command = binding
            .command(mapping, entry.path(), &id)
            .with_args(config.args.iter().cloned());

        debug!(mapping = %mapping.name(), test = %id, "Discovered test");
        cases.push(TestCase {
            mapping: mapping.name().to_string(),
            id,
            dir: entry.path().to_path_buf(),
            command,
            env: env.clone(),
            config,
            config_error,
        });
    }

    cases.sort_by(|a, b| a.id.cmp(&b.id));

    info!(
        mapping = %mapping.name(),
        root = %root.display(),
        count = cases.len(),
        "Discovered tests"
    );

    Ok(cases)
}

/// Runs [`discover`] on the blocking pool.
pub async fn discover_off_thread(mapping: Arc<Mapping>) -> Result<Vec<TestCase>, DiscoveryError> {
    let name = mapping.name().to_string();
    tokio::task::spawn_blocking(move || discover(&mapping))
        .await
        .map_err(|e| DiscoveryError::Walk {
            mapping: name,
            message: e.to_string(),
        })?
}

fn check_root(mapping: &Mapping, root: &Path) -> Result<(), DiscoveryError> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DiscoveryError::MissingRoot {
                mapping: mapping.name().to_string(),
                path: root.to_path_buf(),
            }
        } else {
            DiscoveryError::UnreadableRoot {
                mapping: mapping.name().to_string(),
                path: root.to_path_buf(),
                source: e,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            mapping: mapping.name().to_string(),
            path: root.to_path_buf(),
        });
    }

    std::fs::read_dir(root).map_err(|e| DiscoveryError::UnreadableRoot {
        mapping: mapping.name().to_string(),
        path: root.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// `/`-joined path of `dir` relative to `root`.
fn identifier(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    Some(parts?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{LanguageBinding, MappingKind};
    use std::fs;
    use tempfile::TempDir;

    fn add_cpp_test(root: &Path, id: &str) {
        let dir = root.join("test").join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MappingKind::Cpp.binding().entry_point()), "").unwrap();
    }

    #[test]
    fn test_identifier() {
        assert_eq!(
            identifier(Path::new("/r/test"), Path::new("/r/test/Ice/operations")),
            Some("Ice/operations".to_string())
        );
        assert_eq!(identifier(Path::new("/r/test"), Path::new("/other")), None);
    }

    #[test]
    fn test_discover_sorted_by_identifier() {
        let tmp = TempDir::new().unwrap();
        add_cpp_test(tmp.path(), "b/two");
        add_cpp_test(tmp.path(), "a-c");
        add_cpp_test(tmp.path(), "a/one");
        fs::create_dir_all(tmp.path().join("test/empty")).unwrap();

        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());
        let ids: Vec<String> = discover(&mapping).unwrap().into_iter().map(|c| c.id).collect();

        assert_eq!(ids, vec!["a-c", "a/one", "b/two"]);
    }

    #[test]
    fn test_discover_is_repeatable() {
        let tmp = TempDir::new().unwrap();
        for id in ["z", "m/n", "a"] {
            add_cpp_test(tmp.path(), id);
        }
        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());

        let first: Vec<String> = discover(&mapping).unwrap().into_iter().map(|c| c.id).collect();
        let second: Vec<String> = discover(&mapping).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        add_cpp_test(tmp.path(), ".cache/ghost");
        add_cpp_test(tmp.path(), "real");

        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());
        let cases = discover(&mapping).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "real");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let tmp = TempDir::new().unwrap();
        add_cpp_test(tmp.path(), "Ice/echo");
        add_cpp_test(tmp.path(), "Ice/proxy");
        std::os::unix::fs::symlink("..", tmp.path().join("test/Ice/echo/up")).unwrap();

        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());
        let ids: Vec<String> = discover(&mapping).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["Ice/echo", "Ice/proxy"]);
    }

    #[tokio::test]
    async fn test_discover_off_thread() {
        let tmp = TempDir::new().unwrap();
        add_cpp_test(tmp.path(), "Ice/echo");

        let mapping = Arc::new(Mapping::new("cpp", MappingKind::Cpp, tmp.path()));
        let cases = discover_off_thread(mapping).await.unwrap();
        assert_eq!(cases.len(), 1);

        let missing = Arc::new(Mapping::new("cpp", MappingKind::Cpp, tmp.path().join("absent")));
        assert!(matches!(
            discover_off_thread(missing).await,
            Err(DiscoveryError::MissingRoot { .. })
        ));
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path().join("absent"));
        let err = discover(&mapping).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingRoot { .. }));
        assert_eq!(err.mapping(), "cpp");
    }

    #[test]
    fn test_root_is_a_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("test"), "not a dir").unwrap();
        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());
        assert!(matches!(
            discover(&mapping),
            Err(DiscoveryError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_case_config_applied() {
        let tmp = TempDir::new().unwrap();
        add_cpp_test(tmp.path(), "Ice/retry");
        add_cpp_test(tmp.path(), "Ice/broken");
        fs::write(
            tmp.path().join("test/Ice/retry").join(CASE_CONFIG_FILE),
            "expected_failure: true\nargs: [\"--fast\"]\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("test/Ice/broken").join(CASE_CONFIG_FILE),
            "timeout_secs: soon\n",
        )
        .unwrap();

        let mapping = Mapping::new("cpp", MappingKind::Cpp, tmp.path());
        let cases = discover(&mapping).unwrap();

        let broken = &cases[0];
        assert_eq!(broken.id, "Ice/broken");
        assert!(broken.config_error.is_some());

        let retry = &cases[1];
        assert!(retry.is_expected_failure());
        assert_eq!(retry.command.args, vec!["--fast"]);
        assert!(retry.config_error.is_none());
    }

    #[test]
    fn test_java_discovery_uses_class_marker() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("test/Ice/proxy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Client.class"), "").unwrap();
        fs::write(dir.join("client"), "").unwrap();

        let mapping = Mapping::new("java", MappingKind::Java, tmp.path()).with_launcher("java");
        let cases = discover(&mapping).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].command.args.last().map(String::as_str), Some("Ice.proxy.Client"));
        assert!(cases[0].env.iter().any(|(k, _)| k == "CLASSPATH"));
    }
}
