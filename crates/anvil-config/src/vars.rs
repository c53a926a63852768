//! Build variables
//!
//! A namespace owns a string variable map. Values are fixed at declaration
//! time (platform-conditional manifest values are resolved before they land
//! here). Looking up an unset name is an error, never a silent default; the
//! variables every driver is expected to seed have typed accessors.

use crate::platform::HostPlatform;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variables every build driver seeds before declaration starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinVar {
    /// Build-host platform key ("linux", "darwin", "windows")
    Platform,
    /// Debug build flag, "1" or "0"
    Debug,
    /// Toolchain compiler path
    Cc,
    /// Executable artifact suffix
    ProgramSuffix,
    /// Shared-library artifact suffix
    SharedLibSuffix,
}

impl BuiltinVar {
    /// Variable name as seen by declaration scripts
    pub fn key(&self) -> &'static str {
        match self {
            Self::Platform => "PLATFORM",
            Self::Debug => "DEBUG",
            Self::Cc => "CC",
            Self::ProgramSuffix => "PROGRAM_SUFFIX",
            Self::SharedLibSuffix => "SHARED_LIB_SUFFIX",
        }
    }
}

/// Declaration-time variable map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarMap {
    vars: HashMap<String, String>,
}

impl VarMap {
    /// Create an empty variable map
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builtin variables from the host identity and driver options
    pub fn seeded(platform: HostPlatform, debug: bool, cc: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.set(BuiltinVar::Platform.key(), platform.key());
        map.set(BuiltinVar::Debug.key(), if debug { "1" } else { "0" });
        map.set(BuiltinVar::Cc.key(), cc);
        map.set(BuiltinVar::ProgramSuffix.key(), platform.program_suffix());
        map.set(
            BuiltinVar::SharedLibSuffix.key(),
            platform.shared_lib_suffix(),
        );
        map
    }

    /// Set a variable (later sets overwrite)
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable, failing if unset
    pub fn get(&self, name: &str) -> ConfigResult<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UndefinedVariable(name.to_string()))
    }

    /// Look up a variable without failing
    pub fn get_opt(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether a variable is set
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Iterate over all variables
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another map into this one; existing names are overwritten
    pub fn extend_from(&mut self, other: &VarMap) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    /// Typed accessor: debug flag ("1" is true, anything else false)
    pub fn debug(&self) -> ConfigResult<bool> {
        Ok(self.get(BuiltinVar::Debug.key())? == "1")
    }

    /// Typed accessor: platform key
    pub fn platform(&self) -> ConfigResult<&str> {
        self.get(BuiltinVar::Platform.key())
    }

    /// Typed accessor: toolchain compiler path
    pub fn cc(&self) -> ConfigResult<&str> {
        self.get(BuiltinVar::Cc.key())
    }

    /// Typed accessor: program artifact suffix
    pub fn program_suffix(&self) -> ConfigResult<&str> {
        self.get(BuiltinVar::ProgramSuffix.key())
    }

    /// Typed accessor: shared-library artifact suffix
    pub fn shared_lib_suffix(&self) -> ConfigResult<&str> {
        self.get(BuiltinVar::SharedLibSuffix.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unset_fails() {
        let map = VarMap::new();
        let err = map.get("OUT_ROOT").unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedVariable(name) if name == "OUT_ROOT"));
    }

    #[test]
    fn test_set_and_get() {
        let mut map = VarMap::new();
        map.set("OUT_ROOT", "build/out");
        assert_eq!(map.get("OUT_ROOT").unwrap(), "build/out");
        assert!(map.contains("OUT_ROOT"));
    }

    #[test]
    fn test_seeded_builtins() {
        let map = VarMap::seeded(HostPlatform::Linux, true, "gcc");
        assert_eq!(map.platform().unwrap(), "linux");
        assert!(map.debug().unwrap());
        assert_eq!(map.cc().unwrap(), "gcc");
        assert_eq!(map.program_suffix().unwrap(), "");
        assert_eq!(map.shared_lib_suffix().unwrap(), ".so");
    }

    #[test]
    fn test_seeded_release() {
        let map = VarMap::seeded(HostPlatform::Windows, false, "cl");
        assert!(!map.debug().unwrap());
        assert_eq!(map.program_suffix().unwrap(), ".exe");
        assert_eq!(map.shared_lib_suffix().unwrap(), ".dll");
    }

    #[test]
    fn test_extend_from_overwrites() {
        let mut base = VarMap::seeded(HostPlatform::Linux, true, "cc");
        let mut over = VarMap::new();
        over.set("CC", "clang");
        base.extend_from(&over);
        assert_eq!(base.cc().unwrap(), "clang");
    }

    #[test]
    fn test_builtin_keys() {
        assert_eq!(BuiltinVar::Platform.key(), "PLATFORM");
        assert_eq!(BuiltinVar::SharedLibSuffix.key(), "SHARED_LIB_SUFFIX");
    }
}
