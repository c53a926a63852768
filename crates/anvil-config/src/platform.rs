//! Build-host platform identity
//!
//! The host platform is resolved exactly once, at declaration time.
//! Platform-conditional manifest values are selected against this identity;
//! recipes never branch on platform afterward.

use serde::{Deserialize, Serialize};

/// Identity of the machine the build runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    /// Linux hosts
    Linux,
    /// macOS hosts
    Darwin,
    /// Windows hosts
    Windows,
}

impl HostPlatform {
    /// Detect the platform of the current build host
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Key used for platform-conditional manifest tables
    pub fn key(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Conventional suffix for executable program artifacts
    pub fn program_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    /// Conventional suffix for shared-library artifacts
    pub fn shared_lib_suffix(&self) -> &'static str {
        match self {
            Self::Linux => ".so",
            Self::Darwin => ".dylib",
            Self::Windows => ".dll",
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
