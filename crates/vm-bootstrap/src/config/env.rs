//! Environment-based configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "VM_BOOTSTRAP";

/// Environment variable reader.
///
/// Reads from the process environment by default, or from a fixed map for
/// tests and embedding.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Fixed values used instead of the process environment.
    overrides: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: None,
        }
    }

    /// Read from `vars` instead of the process environment.
    ///
    /// Keys are full variable names, prefix included.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.overrides {
            Some(vars) => vars.get(&var_name).cloned(),
            None => std::env::var(&var_name).ok(),
        }
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a parsed value, failing on malformed input.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|e| ConfigError::invalid(self.var_name(name), format!("{raw:?}: {e}")))
            })
            .transpose()
    }

    /// Get a boolean value.
    pub fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        self.get(name)
            .map(|raw| match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
                "0" | "false" | "no" | "off" | "disabled" => Ok(false),
                _ => Err(ConfigError::invalid(
                    self.var_name(name),
                    format!("{raw:?} is not a boolean"),
                )),
            })
            .transpose()
    }

    /// Get a duration in milliseconds.
    pub fn duration_millis(&self, name: &str) -> Result<Option<Duration>, ConfigError> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_millis))
    }
}

/// Variables read by [`BootstrapConfig::from_env`](super::BootstrapConfig::from_env).
pub mod vars {
    /// Maximum bootstrap attempts.
    pub const MAX_ATTEMPTS: &str = "MAX_ATTEMPTS";
    /// Delay between attempts, in milliseconds.
    pub const RETRY_DELAY_MS: &str = "RETRY_DELAY_MS";
    /// Connect timeout, in milliseconds.
    pub const CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
    /// SSH port.
    pub const SSH_PORT: &str = "SSH_PORT";
    /// Dial the internal address instead of the external one.
    pub const USE_INTERNAL_ADDRESS: &str = "USE_INTERNAL_ADDRESS";
}
