//! Anvil configuration primitives
//!
//! Provides the declaration-time data the build engine consumes:
//! - Ordered, per-category flag sets with a fixed import-merge policy
//! - Build variables with typed accessors for the recognized keys
//! - Host platform identity and artifact suffixes
//! - The TOML namespace manifest (`anvil.toml`)
//!
//! # Example
//!
//! ```no_run
//! use anvil_config::NamespaceManifest;
//! use std::path::Path;
//!
//! let manifest = NamespaceManifest::load_from_file(Path::new("anvil.toml")).unwrap();
//! assert!(!manifest.name.is_empty());
//! ```

pub mod flags;
pub mod manifest;
pub mod platform;
pub mod vars;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Manifest file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {}: {}", .file.display(), .error)]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Unknown flag category '{0}' (expected one of CPPFLAGS, CFLAGS, CXXFLAGS, LDFLAGS)")]
    UnknownCategory(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use flags::{FlagCategory, FlagSet};
pub use manifest::{NamespaceManifest, RecipeDecl, TargetDecl};
pub use platform::HostPlatform;
pub use vars::{BuiltinVar, VarMap};
