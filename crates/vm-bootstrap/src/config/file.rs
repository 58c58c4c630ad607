//! File-based configuration loading.
//!
//! Configuration files are TOML with a `[bootstrap]` table:
//!
//! ```toml
//! [bootstrap]
//! max_attempts = 30
//! retry_delay_ms = 15000
//! connect_timeout_ms = 10000
//! ssh_port = 22
//! use_internal_address = false
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top level of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// The `[bootstrap]` table.
    #[serde(default)]
    pub bootstrap: BootstrapSection,
}

/// The `[bootstrap]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSection {
    /// Maximum attempts.
    pub max_attempts: Option<u32>,
    /// Delay between attempts, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Connect timeout, in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// SSH port.
    pub ssh_port: Option<u16>,
    /// Dial the internal address.
    pub use_internal_address: Option<bool>,
}

impl FileConfig {
    /// Parse TOML content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_section() {
        let config = FileConfig::parse(
            r"
            [bootstrap]
            max_attempts = 5
            retry_delay_ms = 2000
            connect_timeout_ms = 3000
            ssh_port = 2222
            use_internal_address = true
            ",
        )
        .unwrap();

        assert_eq!(
            config.bootstrap,
            BootstrapSection {
                max_attempts: Some(5),
                retry_delay_ms: Some(2000),
                connect_timeout_ms: Some(3000),
                ssh_port: Some(2222),
                use_internal_address: Some(true),
            }
        );
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("[bootstrap]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/vm-bootstrap.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
