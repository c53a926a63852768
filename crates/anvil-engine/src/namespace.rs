//! Namespaces: isolated target graphs with their own flags and variables
//!
//! A namespace owns its graph, flag set and variable map exclusively.
//! Importing another namespace copies flag values into the importer (it
//! never aliases) and makes the source's targets referenceable through
//! qualified `source|target` names.

use crate::error::EngineResult;
use crate::graph::TargetGraph;
use crate::recipe::Recipe;
use anvil_config::{FlagCategory, FlagSet, VarMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A named, isolated target graph plus flags and variables
#[derive(Debug)]
pub struct Namespace {
    name: String,
    graph: TargetGraph,
    flags: FlagSet,
    vars: VarMap,
    imports: Vec<String>,
    root_dir: Option<PathBuf>,
}

impl Namespace {
    /// Create an empty namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: TargetGraph::new(),
            flags: FlagSet::new(),
            vars: VarMap::new(),
            imports: Vec::new(),
            root_dir: None,
        }
    }

    /// Namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared target graph
    pub fn graph(&self) -> &TargetGraph {
        &self.graph
    }

    /// Mutable access for declaration
    pub fn graph_mut(&mut self) -> &mut TargetGraph {
        &mut self.graph
    }

    /// The namespace's flag set
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// The namespace's variables
    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    /// Set a variable; values are final once declaration ends
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.set(name, value);
    }

    /// Copy every variable from `other` into this namespace
    pub fn extend_vars(&mut self, other: &VarMap) {
        self.vars.extend_from(other);
    }

    /// Look up a variable, failing with `UndefinedVariable` if unset
    pub fn var(&self, name: &str) -> EngineResult<&str> {
        Ok(self.vars.get(name)?)
    }

    /// Append flags to a category
    pub fn append_flags<I, S>(&mut self, category: FlagCategory, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.append(category, values);
    }

    /// Declare a dependency edge
    pub fn add_dep(&mut self, consumer: &str, producer: &str) -> EngineResult<()> {
        self.graph.add_dep(consumer, producer)
    }

    /// Declare a chained dependency through an intermediate target
    pub fn add_chained_deps(
        &mut self,
        consumer: &str,
        via: &str,
        producers: &[&str],
    ) -> EngineResult<()> {
        self.graph.add_chained_deps(consumer, via, producers)
    }

    /// Bind a recipe to a target
    pub fn set_recipe(&mut self, target: &str, recipe: Recipe) -> EngineResult<()> {
        self.graph.set_recipe(target, recipe)
    }

    /// Attach a dependency-record file to a target
    pub fn set_depfile(&mut self, target: &str, path: impl Into<PathBuf>) -> EngineResult<()> {
        self.graph.set_depfile(target, path)
    }

    /// Record the namespace's build entry point
    pub fn set_default_target(&mut self, target: &str) -> EngineResult<()> {
        self.graph.set_default_target(target)
    }

    /// The namespace's build entry point
    pub fn default_target(&self) -> Option<&str> {
        self.graph.default_target()
    }

    /// Namespaces imported so far, in import order
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Whether this namespace imported `other` (directly)
    pub fn has_imported(&self, other: &str) -> bool {
        self.imports.iter().any(|i| i == other)
    }

    /// Record an import and merge the source's flags into this namespace.
    ///
    /// Imported flags are prepended (see `FlagSet::merge_imported`); calling
    /// this twice for the same source is a no-op, which keeps imports
    /// idempotent.
    pub fn record_import(&mut self, source: &str, source_flags: &FlagSet) {
        if self.has_imported(source) {
            return;
        }
        self.imports.push(source.to_string());
        self.flags.merge_imported(source_flags);
    }

    /// Directory paths and commands in this namespace resolve against
    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    /// Set the namespace's root directory (its manifest's directory)
    pub fn set_root_dir(&mut self, dir: impl Into<PathBuf>) {
        self.root_dir = Some(dir.into());
    }

    /// Environment for this namespace's subprocess recipes: every variable,
    /// plus the flag categories under their environment names
    pub fn recipe_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = self
            .vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.extend(self.flags.env_map());
        env
    }
}
