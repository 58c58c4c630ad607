//! Error types for vm-bootstrap.
//!
//! Errors are split by where they arise:
//!
//! - [`SshError`] describes a single connect or authentication attempt and
//!   knows whether it is worth retrying.
//! - [`ResolveError`] describes an instance record that cannot be turned into
//!   a dial target.
//! - [`ConfigError`] covers loading configuration from files or the
//!   environment.
//! - [`BootstrapError`] is the only error a caller of the retry controller
//!   ever sees. Low-level transport errors are folded into it.

use std::time::Duration;

use thiserror::Error;

use crate::types::AddressClass;

/// Errors raised by a single connect or authentication attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SshError {
    /// The transport connection could not be opened.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connection {
        /// The host that could not be reached.
        host: String,
        /// The port that was dialed.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// The connection did not complete in time.
    #[error("SSH operation timed out after {duration:?}")]
    Timeout {
        /// The duration that elapsed.
        duration: Duration,
    },

    /// The SSH exchange failed part-way through.
    #[error("SSH protocol error: {reason}")]
    Protocol {
        /// The reason for the failure.
        reason: String,
    },

    /// The server refused the offered credentials.
    #[error("authentication rejected for user '{user}'")]
    Rejected {
        /// The login that was refused.
        user: String,
    },

    /// The private key could not be decoded.
    #[error("invalid private key for user '{user}': {reason}")]
    Key {
        /// The login the key belongs to.
        user: String,
        /// The reason the key is unusable.
        reason: String,
    },

    /// A wait between attempts was interrupted.
    #[error("interrupted while waiting to retry: {reason}")]
    Interrupted {
        /// What interrupted the wait.
        reason: String,
    },

    /// The async runtime backing the blocking API could not be used.
    #[error("runtime error: {reason}")]
    Runtime {
        /// The reason for the failure.
        reason: String,
    },

    /// A component was used in a state it does not support.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Description of the violated precondition.
        reason: String,
    },
}

impl SshError {
    /// Create a connection error.
    pub fn connection(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create an interruption error.
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Whether another attempt may succeed where this one failed.
    ///
    /// Unreachable hosts, services that are not listening yet, timeouts and
    /// broken exchanges are transient. Bad key material, interruptions and
    /// contract violations are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::Protocol { .. } | Self::Rejected { .. }
        )
    }

    /// Check if this is an interruption.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Errors raised while deriving a dial target from an instance record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The instance has no network interface.
    #[error("instance '{instance}' has no network interface")]
    NoNetworkInterface {
        /// Instance name.
        instance: String,
    },

    /// The instance has no address of the requested class.
    #[error("instance '{instance}' has no {class} address")]
    NoAddress {
        /// Instance name.
        instance: String,
        /// The address class that was requested.
        class: AddressClass,
    },

    /// The instance has no login user.
    #[error("instance '{instance}' has no SSH user")]
    MissingUser {
        /// Instance name.
        instance: String,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configuration value is out of range or malformed.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// The offending key.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Classification of a failed bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No key material was supplied.
    NoCredentials,
    /// Every attempt failed.
    Exhausted,
    /// A non-retryable error cut the attempts short.
    Unexpected,
}

/// The failure half of a bootstrap outcome.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// No key pair was available.
    #[error("failed to retrieve SSH keypair for {subject}")]
    NoCredentials {
        /// What the key was needed for, e.g. `instance: agent-1`.
        subject: String,
    },

    /// Authentication did not succeed within the attempt budget.
    #[error("authentication failed after {attempts} attempt(s)")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last transient error seen, if any.
        last_error: Option<SshError>,
    },

    /// A non-retryable error aborted the remaining attempts.
    #[error("bootstrap aborted on attempt {attempt}: {source}")]
    Aborted {
        /// The attempt during which the abort happened.
        attempt: u32,
        /// The error that caused it.
        #[source]
        source: SshError,
    },

    /// The instance record could not be resolved to a dial target.
    #[error("cannot resolve bootstrap target: {0}")]
    Target(#[from] ResolveError),

    /// Bootstrap was requested without a backing instance.
    #[error("bootstrap requested without an instance")]
    MissingInstance,
}

impl BootstrapError {
    /// Classify this failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NoCredentials { .. } => FailureKind::NoCredentials,
            Self::Exhausted { .. } => FailureKind::Exhausted,
            Self::Aborted { .. } | Self::Target(_) | Self::MissingInstance => {
                FailureKind::Unexpected
            }
        }
    }

    /// Check if this is a missing-credentials failure.
    #[must_use]
    pub const fn is_no_credentials(&self) -> bool {
        matches!(self, Self::NoCredentials { .. })
    }

    /// Check if the attempt budget ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if this failure was unexpected.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self.kind(), FailureKind::Unexpected)
    }
}

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SshError::connection("10.0.0.1", 22, "refused").is_transient());
        assert!(SshError::protocol("eof").is_transient());
        assert!(
            SshError::Timeout {
                duration: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(!SshError::interrupted("stop").is_transient());
        assert!(!SshError::invalid_state("no node").is_transient());
        assert!(
            !SshError::Key {
                user: "jenkins".into(),
                reason: "bad pem".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn failure_kinds() {
        let err = BootstrapError::NoCredentials {
            subject: "instance: vm-1".into(),
        };
        assert_eq!(err.kind(), FailureKind::NoCredentials);
        assert!(err.is_no_credentials());

        let err = BootstrapError::Exhausted {
            attempts: 3,
            last_error: None,
        };
        assert!(err.is_exhausted());
        assert_eq!(err.to_string(), "authentication failed after 3 attempt(s)");

        let err = BootstrapError::Aborted {
            attempt: 2,
            source: SshError::interrupted("shutdown"),
        };
        assert!(err.is_unexpected());

        let err: BootstrapError = ResolveError::MissingUser {
            instance: "vm-1".into(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::Unexpected);
        assert_eq!(BootstrapError::MissingInstance.kind(), FailureKind::Unexpected);
    }

    #[test]
    fn connection_error_display() {
        let err = SshError::connection("34.1.2.3", 22, "connection refused");
        assert_eq!(
            err.to_string(),
            "failed to connect to 34.1.2.3:22: connection refused"
        );
    }
}
