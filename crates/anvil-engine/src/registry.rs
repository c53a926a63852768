//! The namespace registry
//!
//! One registry value is constructed per build invocation and passed to
//! whatever needs namespace lookup; there is no ambient global state. It
//! enforces unique namespace names and remembers which manifest files have
//! already been imported so repeated imports are no-ops.

use crate::error::{EngineError, EngineResult};
use crate::namespace::Namespace;
use crate::target::TargetRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Process-wide table of namespaces for one build invocation
#[derive(Debug, Default)]
pub struct Registry {
    namespaces: HashMap<String, Namespace>,
    manifests: HashMap<PathBuf, String>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace, failing if the name is taken
    pub fn add_namespace(&mut self, name: &str) -> EngineResult<&mut Namespace> {
        if self.namespaces.contains_key(name) {
            return Err(EngineError::DuplicateNamespace(name.to_string()));
        }
        Ok(self
            .namespaces
            .entry(name.to_string())
            .or_insert_with(|| Namespace::new(name)))
    }

    /// Look up a namespace
    pub fn get(&self, name: &str) -> EngineResult<&Namespace> {
        self.namespaces
            .get(name)
            .ok_or_else(|| EngineError::UnknownNamespace(name.to_string()))
    }

    /// Look up a namespace mutably
    pub fn get_mut(&mut self, name: &str) -> EngineResult<&mut Namespace> {
        self.namespaces
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownNamespace(name.to_string()))
    }

    /// Whether a namespace exists
    pub fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// All namespaces, in no particular order
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// Namespace already loaded from this (canonical) manifest path, if any
    pub fn namespace_for_manifest(&self, path: &Path) -> Option<&str> {
        self.manifests.get(path).map(String::as_str)
    }

    /// Remember which namespace a manifest path produced
    pub fn record_manifest(&mut self, path: PathBuf, namespace: impl Into<String>) {
        self.manifests.insert(path, namespace.into());
    }

    /// Resolve a possibly-qualified target reference from `from`'s scope.
    ///
    /// Qualified names are only resolvable if the referenced namespace is
    /// `from` itself or one it imported.
    pub fn resolve(&self, from: &str, name: &str) -> EngineResult<(String, String)> {
        let target_ref = TargetRef::parse(name)?;
        match target_ref.namespace {
            Some(ns) if ns == from => Ok((ns, target_ref.target)),
            Some(ns) => {
                let from_ns = self.get(from)?;
                if !from_ns.has_imported(&ns) {
                    return Err(EngineError::NotImported {
                        namespace: ns,
                        from: from.to_string(),
                    });
                }
                self.get(&ns)?;
                Ok((ns, target_ref.target))
            }
            None => Ok((from.to_string(), target_ref.target)),
        }
    }
}
