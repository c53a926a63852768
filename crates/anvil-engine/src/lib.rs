//! Anvil build orchestration engine
//!
//! Provides the core every declaration script assumes exists:
//! - Target graphs with recipes, virtual targets and chained dependencies
//! - Incremental scheduling with mtime staleness and per-run memoization
//! - Dependency discovery from compiler-emitted record files
//! - Namespaces composable by import, looked up through an explicit registry
//!
//! Declaration happens single-threaded through [`Registry`] and
//! [`Namespace`]; scheduling reads the graphs through a [`BuildSession`],
//! which may run independent siblings on a bounded worker pool.

pub mod depfile;
pub mod error;
pub mod fsutil;
pub mod graph;
pub mod loader;
pub mod namespace;
pub mod recipe;
pub mod registry;
pub mod scheduler;
pub mod target;

// Re-export main types
pub use error::{EngineError, EngineResult};
pub use graph::TargetGraph;
pub use loader::{import_namespace, load_project, substitute};
pub use namespace::Namespace;
pub use recipe::{CommandRecipe, Recipe, RecipeContext};
pub use registry::Registry;
pub use scheduler::{BuildOptions, BuildReport, BuildSession, StaleReason};
pub use target::{is_virtual_name, Target, TargetRef, NAMESPACE_SEPARATOR, VIRTUAL_SIGIL};

// Re-export anvil-config types for convenience
pub use anvil_config::{FlagCategory, FlagSet, HostPlatform, VarMap};
