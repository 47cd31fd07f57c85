//! Mapping registry.
//!
//! The registry is built once from configuration, then installed as
//! read-only process-wide state before any run begins. Lookups are exact and
//! case-sensitive.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::{Mapping, MappingKind};
use crate::error::RegistryError;

static GLOBAL_REGISTRY: OnceLock<MappingRegistry> = OnceLock::new();

/// Ordered set of mapping descriptors, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: Vec<Arc<Mapping>>,
}

impl MappingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `cpp` and `java` mappings rooted below `base_dir`.
    pub fn with_defaults(base_dir: &Path) -> Self {
        let mut registry = Self::new();
        for kind in [MappingKind::Cpp, MappingKind::Java] {
            let name = kind.display_name();
            registry
                .mappings
                .push(Arc::new(Mapping::new(name, kind, base_dir.join(name))));
        }
        registry
    }

    /// Adds a mapping. Names must be unique and non-empty.
    pub fn register(&mut self, mapping: Mapping) -> Result<(), RegistryError> {
        if mapping.name().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(mapping.name()) {
            return Err(RegistryError::DuplicateMapping(mapping.name().to_string()));
        }
        debug!(
            mapping = %mapping.name(),
            kind = %mapping.kind(),
            root = %mapping.root().display(),
            "Registered mapping"
        );
        self.mappings.push(Arc::new(mapping));
        Ok(())
    }

    /// Looks up a mapping by exact name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<Mapping>, RegistryError> {
        self.mappings
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMapping(name.to_string()))
    }

    /// Resolves every name, in order, or fails on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<Mapping>>, RegistryError> {
        names.iter().map(|n| self.get_by_name(n.as_ref())).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappings.iter().any(|m| m.name() == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.mappings.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Mapping>> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Installs this registry as the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyInstalled` on a second call.
    pub fn install(self) -> Result<&'static MappingRegistry, RegistryError> {
        GLOBAL_REGISTRY
            .set(self)
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        GLOBAL_REGISTRY.get().ok_or(RegistryError::AlreadyInstalled)
    }

    /// Returns the installed registry, if any.
    pub fn global() -> Option<&'static MappingRegistry> {
        GLOBAL_REGISTRY.get()
    }
}
