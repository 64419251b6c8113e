//! Process configuration for the stubattr binaries.
//!
//! Values come from the environment once at startup and are passed down
//! explicitly; nothing in the library reads the environment on its own.

use std::env;
use std::path::PathBuf;

use crate::utils::is_env_true;

pub const ENV_LOG_LEVEL: &str = "STUBATTR_LOG_LEVEL";
pub const ENV_LOG_PATH: &str = "STUBATTR_LOG_PATH";
pub const ENV_VERIFY: &str = "STUBATTR_VERIFY";

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Runtime settings shared by the binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log level, optionally prefixed with `json:` for JSON lines
    pub log_level: String,
    /// Append log output to this file instead of stderr
    pub log_path: Option<PathBuf>,
    /// Read the payload back after patching and compare
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_path: None,
            verify: false,
        }
    }
}

impl Config {
    /// Build the configuration from `STUBATTR_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_path: env::var_os(ENV_LOG_PATH)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            verify: is_env_true(ENV_VERIFY),
        }
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(mut self, log_level: Option<String>, verify: bool) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self.verify |= verify;
        self
    }
}
