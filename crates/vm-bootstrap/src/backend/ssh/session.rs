//! SSH connection management.
//!
//! [`SshConnector`] opens [`SshSession`]s. Each session keeps a handle to the
//! connector's runtime so it can still be driven, and disconnected, after the
//! connector itself is gone.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use russh::client;
use tokio::runtime::{Builder, Runtime};

use super::handler::BootstrapHandler;
use crate::backend::{Connector, TransportSession};
use crate::error::SshError;
use crate::types::TargetDescriptor;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default SSH keepalive interval.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Connection settings for [`SshConnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SshConnectConfig {
    /// Time allowed for TCP connect plus the SSH handshake.
    pub connect_timeout: Duration,
    /// Keepalive interval for established sessions.
    pub keepalive_interval: Option<Duration>,
}

impl Default for SshConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: Some(DEFAULT_KEEPALIVE_INTERVAL),
        }
    }
}

impl SshConnectConfig {
    /// Set the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the keepalive interval.
    #[must_use]
    pub const fn keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval;
        self
    }
}

/// Opens SSH connections on a private runtime.
pub struct SshConnector {
    runtime: Arc<Runtime>,
    config: SshConnectConfig,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SshConnector {
    /// Create a connector with its own runtime.
    pub fn new(config: SshConnectConfig) -> Result<Self, SshError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("vm-bootstrap-ssh")
            .enable_all()
            .build()
            .map_err(|e| SshError::Runtime {
                reason: format!("failed to create runtime: {e}"),
            })?;
        Ok(Self::with_runtime(Arc::new(runtime), config))
    }

    /// Create a connector on an existing runtime.
    #[must_use]
    pub const fn with_runtime(runtime: Arc<Runtime>, config: SshConnectConfig) -> Self {
        Self { runtime, config }
    }

    /// Get the connection settings.
    #[must_use]
    pub const fn config(&self) -> &SshConnectConfig {
        &self.config
    }
}

impl Connector for SshConnector {
    type Session = SshSession;

    fn open(&mut self, target: &TargetDescriptor) -> Result<SshSession, SshError> {
        let ssh_config = Arc::new(client::Config {
            keepalive_interval: self.config.keepalive_interval,
            ..Default::default()
        });
        let handler = BootstrapHandler::new(&target.host, target.port);
        let addr = (target.host.clone(), target.port);
        let timeout = self.config.connect_timeout;

        tracing::info!(
            host = %target.host,
            port = target.port,
            "Connecting to SSH server"
        );

        let handle = self
            .runtime
            .block_on(async move {
                tokio::time::timeout(timeout, client::connect(ssh_config, addr, handler)).await
            })
            .map_err(|_| SshError::Timeout { duration: timeout })?
            .map_err(|e| SshError::connection(&target.host, target.port, e.to_string()))?;

        Ok(SshSession {
            handle: Some(handle),
            runtime: Arc::clone(&self.runtime),
            target: target.clone(),
            authenticated: false,
        })
    }
}

/// An SSH connection produced by [`SshConnector`].
///
/// Dropping the session disconnects it.
pub struct SshSession {
    handle: Option<client::Handle<BootstrapHandler>>,
    runtime: Arc<Runtime>,
    target: TargetDescriptor,
    authenticated: bool,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("target", &self.target)
            .field("connected", &self.handle.is_some())
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

impl SshSession {
    /// The target this session is connected to.
    #[must_use]
    pub const fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    /// Check if the session has authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Get a reference to the russh handle.
    ///
    /// This is useful for advanced operations like opening channels.
    #[must_use]
    pub const fn handle(&self) -> Option<&client::Handle<BootstrapHandler>> {
        self.handle.as_ref()
    }

    /// Get a mutable reference to the russh handle.
    pub fn handle_mut(&mut self) -> Option<&mut client::Handle<BootstrapHandler>> {
        self.handle.as_mut()
    }

    /// Get the runtime driving this session.
    #[must_use]
    pub const fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Run a future on the session's runtime, blocking until it completes.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub(super) const fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }
}

impl TransportSession for SshSession {
    fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_closed())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            let result = self.runtime.block_on(async {
                handle
                    .disconnect(russh::Disconnect::ByApplication, "", "en")
                    .await
            });
            if let Err(e) = result {
                tracing::debug!(
                    host = %self.target.host,
                    error = %e,
                    "Disconnect failed; dropping connection"
                );
            }
            tracing::debug!(host = %self.target.host, "SSH session closed");
        }
        self.authenticated = false;
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_config_defaults() {
        let config = SshConnectConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.keepalive_interval, Some(Duration::from_secs(60)));

        let config = config
            .connect_timeout(Duration::from_secs(3))
            .keepalive_interval(None);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.keepalive_interval.is_none());
    }

    #[test]
    fn unreachable_port_is_transient() {
        let mut connector =
            SshConnector::new(SshConnectConfig::default().connect_timeout(Duration::from_secs(5)))
                .unwrap();
        // Port 1 on loopback is not expected to run an SSH server.
        let err = connector
            .open(&TargetDescriptor::new("127.0.0.1", 1, "nobody"))
            .unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
