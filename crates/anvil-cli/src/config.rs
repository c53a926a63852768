//! Environment-derived CLI configuration

/// Defaults picked up from the environment before flag parsing
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// ANVIL_JSON=1 makes JSON reports the default
    pub default_json: bool,
}

impl Config {
    /// Read configuration from the environment
    pub fn from_env() -> Self {
        Self {
            default_json: std::env::var("ANVIL_JSON").map(|v| v == "1").unwrap_or(false),
        }
    }
}
