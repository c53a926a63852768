/// Build engine error types
use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Namespace '{0}' already exists")]
    DuplicateNamespace(String),

    #[error("Unknown namespace '{0}'")]
    UnknownNamespace(String),

    #[error("Namespace '{namespace}' is not imported by '{from}'")]
    NotImported { namespace: String, from: String },

    #[error("Target '{target}' already has a recipe")]
    RecipeConflict { target: String },

    #[error("Dependency cycle detected: {path}")]
    DependencyCycle { path: String },

    #[error("Recipe for '{target}' failed: {cause}")]
    RecipeFailed { target: String, cause: String },

    #[error("Target '{target}' not found in namespace '{namespace}'")]
    TargetNotFound { target: String, namespace: String },

    #[error("Namespace '{0}' has no default target")]
    NoDefaultTarget(String),

    #[error("Invalid target name: {0}")]
    InvalidTarget(String),

    #[error("Build aborted before '{target}' after an earlier failure")]
    BuildAborted { target: String },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Config(#[from] anvil_config::ConfigError),

    #[error("I/O error at {}: {}", .path.display(), .error)]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a recipe failure for a target
    pub fn recipe_failed(target: impl Into<String>, cause: impl ToString) -> Self {
        Self::RecipeFailed {
            target: target.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a cycle error from the closing path
    pub fn cycle(path: &[String]) -> Self {
        Self::DependencyCycle {
            path: path.join(" -> "),
        }
    }

    /// Create a target-not-found error
    pub fn target_not_found(target: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::TargetNotFound {
            target: target.into(),
            namespace: namespace.into(),
        }
    }
}
