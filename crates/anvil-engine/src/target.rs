//! Target identity and per-target records
//!
//! A target is named by its artifact path, or by a symbolic name beginning
//! with the reserved `@` sigil for virtual targets (grouping nodes and
//! side-effect actions with no filesystem artifact). Targets in another
//! namespace are referenced with a qualified `namespace|target` name.

use crate::error::{EngineError, EngineResult};
use crate::recipe::Recipe;
use std::path::{Path, PathBuf};

/// Reserved prefix marking virtual targets
pub const VIRTUAL_SIGIL: char = '@';

/// Separator in qualified cross-namespace target names
pub const NAMESPACE_SEPARATOR: char = '|';

/// Whether a target name denotes a virtual target
pub fn is_virtual_name(name: &str) -> bool {
    name.starts_with(VIRTUAL_SIGIL)
}

/// A possibly-qualified target reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetRef {
    /// Referenced namespace, if qualified
    pub namespace: Option<String>,
    /// Target name within that namespace
    pub target: String,
}

impl TargetRef {
    /// Parse a reference of the form `target` or `namespace|target`
    pub fn parse(name: &str) -> EngineResult<Self> {
        if name.is_empty() {
            return Err(EngineError::InvalidTarget("empty target name".to_string()));
        }
        match name.split_once(NAMESPACE_SEPARATOR) {
            Some((ns, target)) => {
                if ns.is_empty() || target.is_empty() {
                    return Err(EngineError::InvalidTarget(name.to_string()));
                }
                Ok(Self {
                    namespace: Some(ns.to_string()),
                    target: target.to_string(),
                })
            }
            None => Ok(Self {
                namespace: None,
                target: name.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}{}{}", ns, NAMESPACE_SEPARATOR, self.target),
            None => write!(f, "{}", self.target),
        }
    }
}

/// A node in the target graph
#[derive(Debug)]
pub struct Target {
    name: String,
    deps: Vec<String>,
    recipe: Option<Recipe>,
    depfile: Option<PathBuf>,
}

impl Target {
    /// Create a target with no dependencies and no recipe
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            recipe: None,
            depfile: None,
        }
    }

    /// Target name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a virtual target
    pub fn is_virtual(&self) -> bool {
        is_virtual_name(&self.name)
    }

    /// Artifact path for concrete targets
    pub fn path(&self) -> Option<&Path> {
        if self.is_virtual() {
            None
        } else {
            Some(Path::new(&self.name))
        }
    }

    /// Declared producers, in declaration order
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Add a producer edge; repeated edges to the same producer are a no-op
    pub fn add_dep(&mut self, producer: impl Into<String>) {
        let producer = producer.into();
        if !self.deps.iter().any(|d| *d == producer) {
            self.deps.push(producer);
        }
    }

    /// Bound recipe, if any
    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }

    /// Bind the recipe; at most one per target
    pub fn bind_recipe(&mut self, recipe: Recipe) -> EngineResult<()> {
        if self.recipe.is_some() {
            return Err(EngineError::RecipeConflict {
                target: self.name.clone(),
            });
        }
        self.recipe = Some(recipe);
        Ok(())
    }

    /// Dependency-record file consulted by discovery
    pub fn depfile(&self) -> Option<&Path> {
        self.depfile.as_deref()
    }

    /// Attach a dependency-record file
    pub fn set_depfile(&mut self, path: impl Into<PathBuf>) {
        self.depfile = Some(path.into());
    }
}
