//! Build scheduling
//!
//! One `BuildSession` is one logical pass over the dependency graph. The
//! session resolves the requested target, walks producers depth-first,
//! refreshes dependency records, decides staleness, and runs recipes in
//! dependency order — each target at most once per run, so diamond-shaped
//! graphs build every node exactly once.
//!
//! The declared graphs are read-only during scheduling; the only mutable
//! state is the session's own node table behind a mutex, which is what
//! allows independent siblings to run on a bounded worker pool. The first
//! recipe failure stops new work from being scheduled; siblings already
//! running finish, then the invocation fails with that first error.

use crate::depfile;
use crate::error::{EngineError, EngineResult};
use crate::recipe::RecipeContext;
use crate::registry::Registry;
use crate::target::{is_virtual_name, Target, TargetRef, NAMESPACE_SEPARATOR};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Options for one build invocation
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Worker count: 1 builds strictly sequentially, 0 uses one worker per
    /// core, anything else bounds the pool
    pub jobs: usize,
    /// Build-wide subprocess timeout; per-recipe timeouts override it
    pub timeout: Option<Duration>,
    /// Verbose output
    pub verbose: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            timeout: None,
            verbose: false,
        }
    }
}

/// Why a target was considered stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// Concrete target with no artifact on disk
    MissingArtifact,
    /// A producer ran its recipe this run
    ProducerRebuilt(String),
    /// A producer's artifact is newer than this target's
    ProducerNewer(String),
    /// A producer's artifact is missing
    ProducerMissing(String),
    /// The dependency record is absent; recoverable, forces a rebuild
    MissingDependencyRecord,
    /// Virtual target with a recipe; actions run every invocation
    ActionTarget,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingArtifact => write!(f, "missing artifact"),
            Self::ProducerRebuilt(p) => write!(f, "producer {} rebuilt", p),
            Self::ProducerNewer(p) => write!(f, "producer {} is newer", p),
            Self::ProducerMissing(p) => write!(f, "producer {} is missing", p),
            Self::MissingDependencyRecord => write!(f, "missing dependency record"),
            Self::ActionTarget => write!(f, "action target"),
        }
    }
}

/// Result of a successful build pass
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Targets visited
    pub visited: usize,
    /// Recipes executed
    pub executed: usize,
    /// Recipe-bearing targets skipped because they were fresh
    pub fresh: usize,
    /// Wall-clock duration
    #[serde(with = "serde_millis")]
    pub duration: Duration,
    /// Qualified target names in completion order (a topological order)
    pub order: Vec<String>,
}

/// A target addressed by namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeId {
    namespace: String,
    target: String,
}

impl NodeId {
    fn qualified(&self) -> String {
        format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.target)
    }
}

/// What a finished node reports to its consumers
#[derive(Debug, Clone, Copy, Default)]
struct NodeOutcome {
    /// An artifact was (re)produced this run, directly or via grouping
    rebuilt: bool,
    /// Effective timestamp for staleness comparisons
    stamp: Option<SystemTime>,
    /// A concrete artifact that should exist does not
    missing: bool,
}

enum NodeState {
    InProgress,
    Done(NodeOutcome),
    Failed,
}

#[derive(Default)]
struct SessionStats {
    executed: usize,
    fresh: usize,
    order: Vec<String>,
}

/// One build invocation over a registry's graphs
pub struct BuildSession<'a> {
    registry: &'a Registry,
    options: BuildOptions,
    state: Mutex<HashMap<NodeId, NodeState>>,
    failed: AtomicBool,
    first_error: Mutex<Option<EngineError>>,
    stats: Mutex<SessionStats>,
}

impl<'a> BuildSession<'a> {
    /// Create a session over the given registry
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            options: BuildOptions::default(),
            state: Mutex::new(HashMap::new()),
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            stats: Mutex::new(SessionStats::default()),
        }
    }

    /// Set build options
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Build `target` (or the namespace's default target) and everything it
    /// transitively depends on. A session is one pass; build a fresh
    /// session for the next invocation.
    pub fn build(self, namespace: &str, target: Option<&str>) -> EngineResult<BuildReport> {
        let start = Instant::now();
        let entry = self.entry_node(namespace, target)?;

        let result = if self.options.jobs == 1 {
            self.build_node(&entry, &[])
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .build()
                .map_err(|e| EngineError::WorkerPool(e.to_string()))?;
            pool.install(|| self.build_node(&entry, &[]))
        };

        match result {
            Ok(_) => {
                let stats = lock(&self.stats);
                Ok(BuildReport {
                    visited: stats.order.len(),
                    executed: stats.executed,
                    fresh: stats.fresh,
                    duration: start.elapsed(),
                    order: stats.order.clone(),
                })
            }
            Err(e) => match lock(&self.first_error).take() {
                Some(first) => Err(first),
                None => Err(e),
            },
        }
    }

    /// Compute the build order for `target` without executing anything.
    ///
    /// Walks declared edges plus whatever the existing dependency records
    /// discover, and reports qualified names producers-first.
    pub fn plan(&self, namespace: &str, target: Option<&str>) -> EngineResult<Vec<String>> {
        let entry = self.entry_node(namespace, target)?;
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        self.plan_node(&entry, &mut visited, &mut stack, &mut order)?;
        Ok(order)
    }

    fn entry_node(&self, namespace: &str, target: Option<&str>) -> EngineResult<NodeId> {
        match target {
            Some(name) => {
                let target_ref = TargetRef::parse(name)?;
                let ns = target_ref
                    .namespace
                    .unwrap_or_else(|| namespace.to_string());
                self.registry.get(&ns)?;
                Ok(NodeId {
                    namespace: ns,
                    target: target_ref.target,
                })
            }
            None => {
                let ns = self.registry.get(namespace)?;
                let default = ns
                    .default_target()
                    .ok_or_else(|| EngineError::NoDefaultTarget(namespace.to_string()))?;
                Ok(NodeId {
                    namespace: namespace.to_string(),
                    target: default.to_string(),
                })
            }
        }
    }

    fn resolve_node(&self, from: &str, name: &str) -> EngineResult<NodeId> {
        let (namespace, target) = self.registry.resolve(from, name)?;
        Ok(NodeId { namespace, target })
    }

    /// Build one node, memoized for the remainder of the invocation.
    fn build_node(&self, node: &NodeId, stack: &[NodeId]) -> EngineResult<NodeOutcome> {
        if let Some(pos) = stack.iter().position(|n| n == node) {
            let mut path: Vec<String> = stack[pos..].iter().map(NodeId::qualified).collect();
            path.push(node.qualified());
            return Err(EngineError::cycle(&path));
        }

        loop {
            let mut state = lock(&self.state);
            match state.get(node) {
                Some(NodeState::Done(outcome)) => return Ok(*outcome),
                Some(NodeState::Failed) => {
                    return Err(EngineError::BuildAborted {
                        target: node.qualified(),
                    })
                }
                Some(NodeState::InProgress) => {
                    // Another worker owns this node; wait for it
                    drop(state);
                    std::thread::sleep(Duration::from_millis(1));
                }
                None => {
                    state.insert(node.clone(), NodeState::InProgress);
                    break;
                }
            }
        }

        match self.visit(node, stack) {
            Ok(outcome) => {
                lock(&self.state).insert(node.clone(), NodeState::Done(outcome));
                let mut stats = lock(&self.stats);
                stats.order.push(node.qualified());
                Ok(outcome)
            }
            Err(e) => {
                // Record the error before anything can observe the failure,
                // so aborted siblings never displace it as the reported cause.
                {
                    let mut first = lock(&self.first_error);
                    if first.is_none() {
                        *first = Some(e);
                    }
                }
                lock(&self.state).insert(node.clone(), NodeState::Failed);
                self.failed.store(true, Ordering::SeqCst);
                Err(EngineError::BuildAborted {
                    target: node.qualified(),
                })
            }
        }
    }

    /// Resolve producers, refresh discovery, decide staleness, run the
    /// recipe if needed.
    fn visit(&self, node: &NodeId, stack: &[NodeId]) -> EngineResult<NodeOutcome> {
        let ns = self.registry.get(&node.namespace)?;
        let target = ns
            .graph()
            .get(&node.target)
            .ok_or_else(|| EngineError::target_not_found(&node.target, &node.namespace))?;

        let mut child_stack = stack.to_vec();
        child_stack.push(node.clone());

        // Declared producers, fully resolved before this node's recipe may run.
        let producer_ids = target
            .deps()
            .iter()
            .map(|dep| self.resolve_node(&node.namespace, dep))
            .collect::<EngineResult<Vec<_>>>()?;

        let outcomes: Vec<NodeOutcome> = if self.options.jobs != 1 && producer_ids.len() > 1 {
            producer_ids
                .par_iter()
                .map(|p| self.build_node(p, &child_stack))
                .collect::<EngineResult<Vec<_>>>()?
        } else {
            let mut outcomes = Vec::with_capacity(producer_ids.len());
            for p in &producer_ids {
                outcomes.push(self.build_node(p, &child_stack)?);
            }
            outcomes
        };

        let mut producers: Vec<(String, NodeOutcome)> = target
            .deps()
            .iter()
            .cloned()
            .zip(outcomes)
            .collect();

        // Dependency discovery: parse the latest record and add its entries
        // as transient producers for this run only.
        let mut missing_record = false;
        if let Some(record_path) = target.depfile() {
            match depfile::read_depfile(record_path)? {
                None => missing_record = true,
                Some(entries) => {
                    for entry in entries {
                        let name = entry.to_string_lossy().into_owned();
                        if name == node.target {
                            continue;
                        }
                        if ns.graph().contains(&name) {
                            let extra = NodeId {
                                namespace: node.namespace.clone(),
                                target: name.clone(),
                            };
                            let outcome = self.build_node(&extra, &child_stack)?;
                            producers.push((name, outcome));
                        } else {
                            producers.push((name, stat_outcome(&entry)));
                        }
                    }
                }
            }
        }

        if target.is_virtual() {
            self.visit_virtual(node, target, &producers)
        } else {
            self.visit_concrete(node, target, &producers, missing_record)
        }
    }

    fn visit_virtual(
        &self,
        node: &NodeId,
        target: &Target,
        producers: &[(String, NodeOutcome)],
    ) -> EngineResult<NodeOutcome> {
        match target.recipe() {
            // Action: runs every invocation, after its producers; actions
            // produce no artifact, so they never invalidate consumers.
            Some(recipe) => {
                self.execute(node, target, producers, recipe, &StaleReason::ActionTarget)?;
                Ok(NodeOutcome::default())
            }
            // Grouping node: never runs, only forwards its producers' state.
            None => Ok(NodeOutcome {
                rebuilt: producers.iter().any(|(_, o)| o.rebuilt),
                stamp: producers.iter().filter_map(|(_, o)| o.stamp).max(),
                missing: producers.iter().any(|(_, o)| o.missing),
            }),
        }
    }

    fn visit_concrete(
        &self,
        node: &NodeId,
        target: &Target,
        producers: &[(String, NodeOutcome)],
        missing_record: bool,
    ) -> EngineResult<NodeOutcome> {
        let path = Path::new(&node.target);
        let artifact_mtime = mtime(path);

        let reason = stale_reason(artifact_mtime, producers, missing_record, target.depfile());

        match (&reason, target.recipe()) {
            (Some(reason), Some(recipe)) => {
                self.execute(node, target, producers, recipe, reason)?;
                Ok(NodeOutcome {
                    rebuilt: true,
                    stamp: mtime(path),
                    missing: !path.exists(),
                })
            }
            (Some(_), None) => {
                // Nothing to run: a plain source file, or an artifact some
                // other recipe is expected to produce. Report what's on disk.
                Ok(NodeOutcome {
                    rebuilt: false,
                    stamp: artifact_mtime,
                    missing: artifact_mtime.is_none(),
                })
            }
            (None, recipe) => {
                if recipe.is_some() {
                    let mut stats = lock(&self.stats);
                    stats.fresh += 1;
                }
                Ok(NodeOutcome {
                    rebuilt: false,
                    stamp: artifact_mtime,
                    missing: false,
                })
            }
        }
    }

    fn execute(
        &self,
        node: &NodeId,
        target: &Target,
        producers: &[(String, NodeOutcome)],
        recipe: &crate::recipe::Recipe,
        reason: &StaleReason,
    ) -> EngineResult<()> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(EngineError::BuildAborted {
                target: node.qualified(),
            });
        }

        let ns = self.registry.get(&node.namespace)?;
        if self.options.verbose {
            println!("Building {} ({})", node.qualified(), reason);
        }

        if let Some(path) = target.path() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
                }
            }
        }

        let producer_paths: Vec<PathBuf> = producers
            .iter()
            .filter_map(|(name, _)| {
                let name = name
                    .split_once(NAMESPACE_SEPARATOR)
                    .map(|(_, t)| t)
                    .unwrap_or(name.as_str());
                if is_virtual_name(name) {
                    None
                } else {
                    Some(PathBuf::from(name))
                }
            })
            .collect();

        let mut env = ns.recipe_env();
        if let Some(path) = target.path() {
            env.insert("OUT".to_string(), path.display().to_string());
        }
        if let Some(first) = producer_paths.first() {
            env.insert("IN".to_string(), first.display().to_string());
        }

        let ctx = RecipeContext {
            target: node.qualified(),
            target_path: target.path().map(Path::to_path_buf),
            producers: producer_paths,
            env,
            working_dir: ns.root_dir().map(Path::to_path_buf),
            timeout: self.options.timeout,
            verbose: self.options.verbose,
        };

        recipe
            .run(&ctx)
            .map_err(|cause| EngineError::recipe_failed(node.qualified(), cause))?;

        let mut stats = lock(&self.stats);
        stats.executed += 1;
        Ok(())
    }

    fn plan_node(
        &self,
        node: &NodeId,
        visited: &mut HashSet<NodeId>,
        stack: &mut Vec<NodeId>,
        order: &mut Vec<String>,
    ) -> EngineResult<()> {
        if let Some(pos) = stack.iter().position(|n| n == node) {
            let mut path: Vec<String> = stack[pos..].iter().map(NodeId::qualified).collect();
            path.push(node.qualified());
            return Err(EngineError::cycle(&path));
        }
        if visited.contains(node) {
            return Ok(());
        }

        let ns = self.registry.get(&node.namespace)?;
        let target = ns
            .graph()
            .get(&node.target)
            .ok_or_else(|| EngineError::target_not_found(&node.target, &node.namespace))?;

        stack.push(node.clone());
        for dep in target.deps() {
            let producer = self.resolve_node(&node.namespace, dep)?;
            self.plan_node(&producer, visited, stack, order)?;
        }
        if let Some(record_path) = target.depfile() {
            if let Some(entries) = depfile::read_depfile(record_path)? {
                for entry in entries {
                    let name = entry.to_string_lossy().into_owned();
                    if name != node.target && ns.graph().contains(&name) {
                        let extra = NodeId {
                            namespace: node.namespace.clone(),
                            target: name,
                        };
                        self.plan_node(&extra, visited, stack, order)?;
                    }
                }
            }
        }
        stack.pop();

        visited.insert(node.clone());
        order.push(node.qualified());
        Ok(())
    }
}

/// Decide whether a concrete target must rebuild.
fn stale_reason(
    artifact_mtime: Option<SystemTime>,
    producers: &[(String, NodeOutcome)],
    missing_record: bool,
    depfile: Option<&Path>,
) -> Option<StaleReason> {
    let artifact_mtime = match artifact_mtime {
        None => return Some(StaleReason::MissingArtifact),
        Some(t) => t,
    };

    if depfile.is_some() && missing_record {
        return Some(StaleReason::MissingDependencyRecord);
    }

    for (name, outcome) in producers {
        if outcome.rebuilt {
            return Some(StaleReason::ProducerRebuilt(name.clone()));
        }
        if outcome.missing {
            return Some(StaleReason::ProducerMissing(name.clone()));
        }
        if let Some(stamp) = outcome.stamp {
            if stamp > artifact_mtime {
                return Some(StaleReason::ProducerNewer(name.clone()));
            }
        }
    }
    None
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Outcome for a discovered producer that is not a declared target.
fn stat_outcome(path: &Path) -> NodeOutcome {
    match mtime(path) {
        Some(stamp) => NodeOutcome {
            rebuilt: false,
            stamp: Some(stamp),
            missing: false,
        },
        None => NodeOutcome {
            rebuilt: false,
            stamp: None,
            missing: true,
        },
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serialize durations as whole milliseconds
mod serde_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Recipe;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Recipe that records its target name and writes the artifact.
    fn tracing_recipe(log: Arc<Mutex<Vec<String>>>) -> Recipe {
        Recipe::from_fn(move |ctx| {
            log.lock().unwrap().push(ctx.target.clone());
            if let Some(path) = &ctx.target_path {
                fs::write(path, "artifact").map_err(|e| e.to_string())?;
            }
            Ok(())
        })
    }

    #[test]
    fn test_default_target_missing() {
        let mut registry = Registry::new();
        registry.add_namespace("nut").unwrap();
        let session = BuildSession::new(&registry);
        let err = session.build("nut", None).unwrap_err();
        assert!(matches!(err, EngineError::NoDefaultTarget(_)));
    }

    #[test]
    fn test_unknown_entry_target() {
        let mut registry = Registry::new();
        registry.add_namespace("nut").unwrap();
        let session = BuildSession::new(&registry);
        let err = session.build("nut", Some("@ghost")).unwrap_err();
        assert!(matches!(err, EngineError::TargetNotFound { .. }));
    }

    #[test]
    fn test_linear_chain_builds_in_order() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.c");
        let obj = dir.path().join("a.o");
        let lib = dir.path().join("lib.so");
        touch(&src, "source");

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_chained_deps(
            lib.to_str().unwrap(),
            obj.to_str().unwrap(),
            &[src.to_str().unwrap()],
        )
        .unwrap();
        ns.set_recipe(obj.to_str().unwrap(), tracing_recipe(log.clone()))
            .unwrap();
        ns.set_recipe(lib.to_str().unwrap(), tracing_recipe(log.clone()))
            .unwrap();

        let report = BuildSession::new(&registry)
            .build("nut", Some(lib.to_str().unwrap()))
            .unwrap();

        assert_eq!(report.executed, 2);
        let ran = log.lock().unwrap().clone();
        assert_eq!(ran.len(), 2);
        assert!(ran[0].contains("a.o"));
        assert!(ran[1].contains("lib.so"));
    }

    #[test]
    fn test_cycle_fails_without_running_recipes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_dep("@a", "@b").unwrap();
        ns.add_dep("@b", "@a").unwrap();
        ns.set_recipe("@a", tracing_recipe(log.clone())).unwrap();
        ns.set_recipe("@b", tracing_recipe(log.clone())).unwrap();

        let err = BuildSession::new(&registry)
            .build("nut", Some("@a"))
            .unwrap_err();
        match err {
            EngineError::DependencyCycle { path } => {
                assert!(path.contains("@a") && path.contains("@b"), "path: {}", path);
            }
            other => panic!("Expected DependencyCycle, got {:?}", other),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fresh_target_not_rebuilt() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.c");
        let out = dir.path().join("a.o");
        touch(&src, "source");

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_dep(out.to_str().unwrap(), src.to_str().unwrap())
            .unwrap();
        ns.set_recipe(out.to_str().unwrap(), tracing_recipe(log.clone()))
            .unwrap();

        let first = BuildSession::new(&registry)
            .build("nut", Some(out.to_str().unwrap()))
            .unwrap();
        assert_eq!(first.executed, 1);

        let second = BuildSession::new(&registry)
            .build("nut", Some(out.to_str().unwrap()))
            .unwrap();
        assert_eq!(second.executed, 0);
        assert_eq!(second.fresh, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_recipe_failure_is_fatal_and_names_target() {
        let dir = TempDir::new().unwrap();
        let obj = dir.path().join("a.o");
        let lib = dir.path().join("lib.so");

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_dep(lib.to_str().unwrap(), obj.to_str().unwrap())
            .unwrap();
        ns.set_recipe(
            obj.to_str().unwrap(),
            Recipe::from_fn(|_| Err("boom".to_string())),
        )
        .unwrap();
        ns.set_recipe(lib.to_str().unwrap(), tracing_recipe(log.clone()))
            .unwrap();

        let err = BuildSession::new(&registry)
            .build("nut", Some(lib.to_str().unwrap()))
            .unwrap_err();
        match err {
            EngineError::RecipeFailed { target, cause } => {
                assert!(target.contains("a.o"));
                assert_eq!(cause, "boom");
            }
            other => panic!("Expected RecipeFailed, got {:?}", other),
        }
        // The consumer never ran
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_diamond_builds_each_node_once() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.o");
        let left = dir.path().join("left.o");
        let right = dir.path().join("right.o");
        let top = dir.path().join("top.so");

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        for (consumer, producer) in [
            (&top, &left),
            (&top, &right),
            (&left, &base),
            (&right, &base),
        ] {
            ns.add_dep(consumer.to_str().unwrap(), producer.to_str().unwrap())
                .unwrap();
        }
        for t in [&base, &left, &right, &top] {
            ns.set_recipe(t.to_str().unwrap(), tracing_recipe(log.clone()))
                .unwrap();
        }

        let report = BuildSession::new(&registry)
            .build("nut", Some(top.to_str().unwrap()))
            .unwrap();
        assert_eq!(report.executed, 4);
        assert_eq!(report.visited, 4);

        let ran = log.lock().unwrap().clone();
        assert_eq!(ran.len(), 4, "each node exactly once: {:?}", ran);
        assert!(ran[0].contains("base.o"));
        assert!(ran[3].contains("top.so"));
    }

    #[test]
    fn test_plan_reports_topological_order() {
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_dep("@all", "@lib").unwrap();
        ns.add_dep("@lib", "@obj").unwrap();
        ns.set_default_target("@all").unwrap();

        let session = BuildSession::new(&registry);
        let order = session.plan("nut", None).unwrap();
        assert_eq!(order, ["nut|@obj", "nut|@lib", "nut|@all"]);
    }

    #[test]
    fn test_virtual_action_runs_every_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.set_recipe("@run", tracing_recipe(log.clone())).unwrap();

        BuildSession::new(&registry).build("nut", Some("@run")).unwrap();
        BuildSession::new(&registry).build("nut", Some("@run")).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_action_does_not_invalidate_consumer() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a.o");

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        let ns = registry.add_namespace("nut").unwrap();
        ns.add_dep(out.to_str().unwrap(), "@scan").unwrap();
        ns.set_recipe("@scan", Recipe::from_fn(|_| Ok(()))).unwrap();
        ns.set_recipe(out.to_str().unwrap(), tracing_recipe(log.clone()))
            .unwrap();

        BuildSession::new(&registry)
            .build("nut", Some(out.to_str().unwrap()))
            .unwrap();
        let second = BuildSession::new(&registry)
            .build("nut", Some(out.to_str().unwrap()))
            .unwrap();
        // @scan ran both times, but the artifact stayed fresh
        assert_eq!(second.executed, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
