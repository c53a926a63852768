//! The declared target graph of one namespace
//!
//! Nodes are created lazily: naming a target as either endpoint of an edge
//! is enough to bring a placeholder record into existence. Producers may be
//! qualified (`other|target`) to reference an imported namespace; consumers
//! are always local, since a namespace only declares its own targets.

use crate::error::{EngineError, EngineResult};
use crate::recipe::Recipe;
use crate::target::{Target, TargetRef, NAMESPACE_SEPARATOR};
use std::collections::HashMap;
use std::path::PathBuf;

/// Declared targets and edges of one namespace
#[derive(Debug, Default)]
pub struct TargetGraph {
    targets: HashMap<String, Target>,
    default_target: Option<String>,
}

impl TargetGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a target
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Whether a target exists
    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// All targets, in no particular order
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Number of declared targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the graph has no targets
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Declare a target with no edges yet
    pub fn declare(&mut self, name: &str) -> EngineResult<()> {
        validate_local(name)?;
        self.ensure(name);
        Ok(())
    }

    /// Add a dependency edge, creating placeholder targets for either
    /// endpoint as needed. Repeating an edge is a no-op.
    pub fn add_dep(&mut self, consumer: &str, producer: &str) -> EngineResult<()> {
        validate_local(consumer)?;
        TargetRef::parse(producer)?;

        self.ensure(consumer).add_dep(producer);
        // Local producers get a placeholder record too; qualified ones live
        // in their own namespace and are resolved at schedule time.
        if !producer.contains(NAMESPACE_SEPARATOR) {
            self.ensure(producer);
        }
        Ok(())
    }

    /// Insert the intermediate target `via` between `producers` and
    /// `consumer`: edges `consumer -> via` and `via -> p` for every `p`.
    ///
    /// All names are validated before any edge is written, so a bad name
    /// cannot leave a half-wired chain. `via`'s recipe (bound separately)
    /// runs once when the intermediate is built.
    pub fn add_chained_deps(
        &mut self,
        consumer: &str,
        via: &str,
        producers: &[&str],
    ) -> EngineResult<()> {
        validate_local(consumer)?;
        validate_local(via)?;
        for producer in producers {
            TargetRef::parse(producer)?;
        }

        self.add_dep(consumer, via)?;
        for producer in producers {
            self.add_dep(via, producer)?;
        }
        Ok(())
    }

    /// Bind a recipe; at most one per target
    pub fn set_recipe(&mut self, target: &str, recipe: Recipe) -> EngineResult<()> {
        validate_local(target)?;
        self.ensure(target).bind_recipe(recipe)
    }

    /// Attach a dependency-record file to a target
    pub fn set_depfile(&mut self, target: &str, path: impl Into<PathBuf>) -> EngineResult<()> {
        validate_local(target)?;
        self.ensure(target).set_depfile(path);
        Ok(())
    }

    /// Record the namespace's build entry point
    pub fn set_default_target(&mut self, target: &str) -> EngineResult<()> {
        validate_local(target)?;
        self.ensure(target);
        self.default_target = Some(target.to_string());
        Ok(())
    }

    /// The namespace's build entry point, if set
    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    fn ensure(&mut self, name: &str) -> &mut Target {
        self.targets
            .entry(name.to_string())
            .or_insert_with(|| Target::new(name))
    }
}

/// A consumer or intermediate must be a plain local name.
fn validate_local(name: &str) -> EngineResult<()> {
    if name.is_empty() {
        return Err(EngineError::InvalidTarget("empty target name".to_string()));
    }
    if name.contains(NAMESPACE_SEPARATOR) {
        return Err(EngineError::InvalidTarget(format!(
            "'{}': declared targets must be local, not qualified",
            name
        )));
    }
    Ok(())
}
