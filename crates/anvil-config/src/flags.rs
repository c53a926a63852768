//! Ordered flag sets
//!
//! Flags are grouped by category (preprocessor, C, C++, linker) and kept in
//! declaration order, because flag order is semantically significant for
//! some toolchains (library link order in particular). Sets are append-only
//! during declaration and merged across namespace imports with one fixed
//! policy, documented on [`FlagSet::merge_imported`].

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recognized flag categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagCategory {
    /// Preprocessor flags (defines, include paths)
    Preprocessor,
    /// C compile flags
    Compile,
    /// C++ compile flags
    CompileCxx,
    /// Linker flags
    Link,
}

impl FlagCategory {
    /// All categories, in the order they appear in recipe environments
    pub fn all() -> [FlagCategory; 4] {
        [
            Self::Preprocessor,
            Self::Compile,
            Self::CompileCxx,
            Self::Link,
        ]
    }

    /// Environment-variable name this category is exported under
    pub fn env_name(&self) -> &'static str {
        match self {
            Self::Preprocessor => "CPPFLAGS",
            Self::Compile => "CFLAGS",
            Self::CompileCxx => "CXXFLAGS",
            Self::Link => "LDFLAGS",
        }
    }

    /// Parse a category from its environment-style name
    pub fn from_name(name: &str) -> ConfigResult<Self> {
        match name {
            "CPPFLAGS" => Ok(Self::Preprocessor),
            "CFLAGS" => Ok(Self::Compile),
            "CXXFLAGS" => Ok(Self::CompileCxx),
            "LDFLAGS" => Ok(Self::Link),
            other => Err(ConfigError::UnknownCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.env_name())
    }
}

/// Per-category ordered flag lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
    flags: HashMap<FlagCategory, Vec<String>>,
}

impl FlagSet {
    /// Create an empty flag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values to a category, preserving order
    pub fn append<I, S>(&mut self, category: FlagCategory, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags
            .entry(category)
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Flags for a category, in declaration order
    pub fn get(&self, category: FlagCategory) -> &[String] {
        self.flags.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether no category holds any flag
    pub fn is_empty(&self) -> bool {
        self.flags.values().all(Vec::is_empty)
    }

    /// Merge an imported namespace's flags into this set.
    ///
    /// Policy: imported flags are PREPENDED category-wise, so the importer's
    /// own flags come later and win on flag-overriding toolchains. The same
    /// policy applies to every import; repeating an import must be prevented
    /// by the caller's imported-set bookkeeping, not here.
    pub fn merge_imported(&mut self, imported: &FlagSet) {
        for category in FlagCategory::all() {
            let incoming = imported.get(category);
            if incoming.is_empty() {
                continue;
            }
            let own = self.flags.entry(category).or_default();
            let mut merged = incoming.to_vec();
            merged.append(own);
            *own = merged;
        }
    }

    /// Render each non-empty category as a space-joined environment value
    pub fn env_map(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for category in FlagCategory::all() {
            let values = self.get(category);
            if !values.is_empty() {
                env.insert(category.env_name().to_string(), values.join(" "));
            }
        }
        env
    }
}
