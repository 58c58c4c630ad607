//! Configuration for vm-bootstrap.
//!
//! [`BootstrapConfig`] gathers the retry policy and connection settings.
//! Defaults come from constants; the environment and TOML files can override
//! them, and builder methods override both for a single call.

pub mod env;
pub mod file;

use std::path::Path;
use std::time::Duration;

pub use env::EnvConfig;
pub use file::{BootstrapSection, FileConfig};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::target::{DEFAULT_SSH_PORT, TargetResolver};
use crate::types::AddressClass;

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bootstrap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Time allowed for each connect.
    pub connect_timeout: Duration,
    /// SSH port.
    pub port: u16,
    /// Which address to dial.
    pub address_class: AddressClass,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            port: DEFAULT_SSH_PORT,
            address_class: AddressClass::default(),
        }
    }
}

impl BootstrapConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_config(&EnvConfig::default())
    }

    /// Defaults overridden by the variables `source` reads.
    pub fn from_env_config(source: &EnvConfig) -> Result<Self, ConfigError> {
        Self::default().merge_env(source)?.validated()
    }

    /// Defaults overridden by a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::default().merge_file(&FileConfig::load(path)?).validated()
    }

    /// Defaults overridden by TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::default().merge_file(&FileConfig::parse(content)?).validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Apply values from a parsed file.
    #[must_use]
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        let section = &file.bootstrap;
        if let Some(attempts) = section.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(ms) = section.retry_delay_ms {
            self.retry.delay = Duration::from_millis(ms);
        }
        if let Some(ms) = section.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(port) = section.ssh_port {
            self.port = port;
        }
        if let Some(internal) = section.use_internal_address {
            self.address_class = AddressClass::from_use_internal(internal);
        }
        self
    }

    /// Apply values from the environment.
    pub fn merge_env(mut self, source: &EnvConfig) -> Result<Self, ConfigError> {
        use env::vars;

        if let Some(attempts) = source.parse(vars::MAX_ATTEMPTS)? {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = source.duration_millis(vars::RETRY_DELAY_MS)? {
            self.retry.delay = delay;
        }
        if let Some(timeout) = source.duration_millis(vars::CONNECT_TIMEOUT_MS)? {
            self.connect_timeout = timeout;
        }
        if let Some(port) = source.parse(vars::SSH_PORT)? {
            self.port = port;
        }
        if let Some(internal) = source.bool(vars::USE_INTERNAL_ADDRESS)? {
            self.address_class = AddressClass::from_use_internal(internal);
        }
        Ok(self)
    }

    /// Set the maximum attempts.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the SSH port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the address class.
    #[must_use]
    pub const fn address_class(mut self, class: AddressClass) -> Self {
        self.address_class = class;
        self
    }

    /// Check that the configuration can drive a bootstrap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::invalid("connect_timeout", "must be non-zero"));
        }
        Ok(())
    }

    /// Build the target resolver for this configuration.
    #[must_use]
    pub const fn resolver(&self) -> TargetResolver {
        TargetResolver::new(self.address_class).port(self.port)
    }

    /// Build an SSH bootstrapper for this configuration.
    ///
    /// Fails with [`SshError::InvalidState`](crate::error::SshError::InvalidState)
    /// if the configuration does not [`validate`](Self::validate).
    #[cfg(feature = "ssh")]
    pub fn ssh_bootstrapper(
        &self,
    ) -> Result<
        crate::bootstrap::Bootstrapper<
            crate::backend::ssh::SshConnector,
            crate::backend::ssh::PublicKeyAuthenticator,
        >,
        crate::error::SshError,
    > {
        use crate::backend::ssh::{PublicKeyAuthenticator, SshConnectConfig, SshConnector};

        self.validate()
            .map_err(|e| crate::error::SshError::invalid_state(e.to_string()))?;
        let connector =
            SshConnector::new(SshConnectConfig::default().connect_timeout(self.connect_timeout))?;
        Ok(
            crate::bootstrap::Bootstrapper::new(connector, PublicKeyAuthenticator::new())
                .with_policy(self.retry),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.retry.max_attempts, 30);
        assert_eq!(config.retry.delay, Duration::from_millis(15_000));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.port, 22);
        assert_eq!(config.address_class, AddressClass::External);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let env = EnvConfig::from_vars(
            "VM_BOOTSTRAP",
            [
                ("VM_BOOTSTRAP_MAX_ATTEMPTS", "4"),
                ("VM_BOOTSTRAP_RETRY_DELAY_MS", "0"),
                ("VM_BOOTSTRAP_USE_INTERNAL_ADDRESS", "yes"),
            ],
        );
        let config = BootstrapConfig::default().merge_env(&env).unwrap();

        assert_eq!(config.retry, RetryPolicy::immediate(4));
        assert_eq!(config.address_class, AddressClass::Internal);
        assert_eq!(config.port, 22);
    }

    #[test]
    fn env_rejects_garbage() {
        let env = EnvConfig::from_vars("VM_BOOTSTRAP", [("VM_BOOTSTRAP_MAX_ATTEMPTS", "-1")]);
        assert!(BootstrapConfig::default().merge_env(&env).is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = BootstrapConfig::from_toml(
            "[bootstrap]\nmax_attempts = 2\nssh_port = 2222\n",
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.delay, Duration::from_millis(15_000));
        assert_eq!(config.port, 2222);
    }

    #[test]
    fn builder_and_resolver() {
        let config = BootstrapConfig::new()
            .max_attempts(3)
            .retry_delay(Duration::from_millis(10))
            .port(2200)
            .address_class(AddressClass::Internal);
        let resolver = config.resolver();

        assert_eq!(resolver.address_class(), AddressClass::Internal);
        assert_eq!(config.retry.total_delay_budget(), Duration::from_millis(20));
    }

    #[test]
    fn loaders_validate() {
        let err = BootstrapConfig::from_toml("[bootstrap]\nconnect_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "connect_timeout"));

        let env = EnvConfig::from_vars("VM_BOOTSTRAP", [("VM_BOOTSTRAP_SSH_PORT", "0")]);
        assert!(BootstrapConfig::from_env_config(&env).is_err());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let err = BootstrapConfig::new().port(0).validate().unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
