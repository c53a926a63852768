//! Namespace manifests
//!
//! An `anvil.toml` file declares one namespace: its variables, flags,
//! targets, recipes and imports. The manifest is the data the engine's
//! declaration API is driven with; it carries no build logic of its own.
//!
//! Platform-conditional values use inline tables keyed by platform:
//!
//! ```toml
//! name = "nut"
//! default = "${OUT}/libnut${SHARED_LIB_SUFFIX}"
//! import = ["../core/anvil.toml"]
//!
//! [vars]
//! OUT = "out-${PLATFORM}"
//! STDLIB = { darwin = "-lc++", default = "-lstdc++" }
//!
//! [flags]
//! CXXFLAGS = ["-std=c++11"]
//! LDFLAGS = { linux = ["-lpthread"], default = [] }
//!
//! [[targets]]
//! name = "${OUT}/foo.o"
//! deps = ["src/foo.cpp", "@headers"]
//! depfile = "${OUT}/foo.o.d"
//! recipe = { command = "${CC} -c src/foo.cpp -o ${OUT}/foo.o" }
//! ```

use crate::flags::FlagCategory;
use crate::platform::HostPlatform;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A manifest value that may vary by build host platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformValue<T> {
    /// Same value on every platform
    Plain(T),
    /// Per-platform table; the `default` key covers unlisted platforms
    ByPlatform(HashMap<String, T>),
}

impl<T> PlatformValue<T> {
    /// Select the value for the given host, if any applies
    pub fn resolve(&self, platform: HostPlatform) -> Option<&T> {
        match self {
            Self::Plain(value) => Some(value),
            Self::ByPlatform(table) => {
                table.get(platform.key()).or_else(|| table.get("default"))
            }
        }
    }

    fn validate_keys(&self, field: &str) -> ConfigResult<()> {
        if let Self::ByPlatform(table) = self {
            for key in table.keys() {
                match key.as_str() {
                    "linux" | "darwin" | "windows" | "default" => {}
                    other => {
                        return Err(ConfigError::InvalidValue {
                            field: field.to_string(),
                            reason: format!("unknown platform key '{}'", other),
                        })
                    }
                }
            }
        }
        Ok(())
    }
}

/// Recipe declaration attached to a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeDecl {
    /// Shell command, run with the namespace's flags and vars in the
    /// environment and the manifest directory as working directory
    Command {
        command: String,
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
    /// Copy the target's first concrete producer to the target path
    Copy { copy: bool },
    /// Delete the listed paths (files or directories)
    Delete { delete: Vec<String> },
}

/// One target declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDecl {
    /// Target name: a path, or a virtual name beginning with `@`
    pub name: String,
    /// Declared producers
    #[serde(default)]
    pub deps: Vec<String>,
    /// Recipe to run when the target is stale
    #[serde(default)]
    pub recipe: Option<RecipeDecl>,
    /// Dependency-record file refreshed by discovery
    #[serde(default)]
    pub depfile: Option<String>,
}

/// A parsed `anvil.toml` namespace declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceManifest {
    /// Namespace name (unique per registry)
    pub name: String,
    /// Default build target
    #[serde(default)]
    pub default: Option<String>,
    /// Manifests to import, relative to this manifest's directory
    #[serde(default)]
    pub import: Vec<PathBuf>,
    /// Variable declarations
    #[serde(default)]
    pub vars: HashMap<String, PlatformValue<String>>,
    /// Flag declarations keyed by category name (CPPFLAGS, CFLAGS, ...)
    #[serde(default)]
    pub flags: HashMap<String, PlatformValue<Vec<String>>>,
    /// Target declarations
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

impl NamespaceManifest {
    /// Load and validate a manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let manifest: Self =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error: e,
            })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name".to_string(),
                reason: "namespace name cannot be empty".to_string(),
            });
        }

        for (category, value) in &self.flags {
            FlagCategory::from_name(category)?;
            value.validate_keys(&format!("flags.{}", category))?;
        }

        for (name, value) in &self.vars {
            value.validate_keys(&format!("vars.{}", name))?;
        }

        for target in &self.targets {
            target.validate()?;
        }

        Ok(())
    }
}

impl TargetDecl {
    /// Validate one target declaration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "targets.name".to_string(),
                reason: "target name cannot be empty".to_string(),
            });
        }

        match &self.recipe {
            Some(RecipeDecl::Command { command, .. }) if command.is_empty() => {
                Err(ConfigError::InvalidValue {
                    field: format!("targets.{}.recipe", self.name),
                    reason: "command cannot be empty".to_string(),
                })
            }
            Some(RecipeDecl::Copy { copy }) if !copy => Err(ConfigError::InvalidValue {
                field: format!("targets.{}.recipe", self.name),
                reason: "copy must be true".to_string(),
            }),
            Some(RecipeDecl::Delete { delete }) if delete.is_empty() => {
                Err(ConfigError::InvalidValue {
                    field: format!("targets.{}.recipe", self.name),
                    reason: "delete list cannot be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}
